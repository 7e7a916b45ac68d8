// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path sandbox.
//!
//! Every filesystem-touching handler resolves paths through here. A path
//! is admissible iff its canonical absolute form equals the user's home
//! directory or lives beneath it. Cloud-side and generic placeholder
//! prefixes are remapped under the local home first; `..` segments and
//! symlinks are resolved before the containment check.

use std::path::{Component, Path, PathBuf};
use tether_core::EngineError;

/// Cloud-side and generic path prefixes remapped to the local home.
const PLACEHOLDER_PREFIXES: &[&str] = &[
    "/home/appuser",
    "/home/user",
    "/Users/user",
    "C:\\Users\\user",
];

/// The home-directory sandbox all filesystem handlers share.
#[derive(Debug, Clone)]
pub struct Sandbox {
    home: PathBuf,
}

impl Sandbox {
    /// Sandbox rooted at the real user home.
    pub fn new() -> Result<Self, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::fatal("cannot determine home directory"))?;
        Ok(Self { home })
    }

    /// Sandbox rooted at an explicit directory (tests, embedding).
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Remap a known placeholder prefix to the local home, preserving the
    /// remainder. Returns the input unchanged when no prefix matches.
    pub fn remap_placeholder(&self, input: &str) -> PathBuf {
        for prefix in PLACEHOLDER_PREFIXES {
            if let Some(rest) = input.strip_prefix(prefix) {
                let rest = rest.trim_start_matches(['/', '\\']);
                if rest.is_empty() {
                    return self.home.clone();
                }
                // Windows-style placeholders can carry backslash remainders.
                let rest = rest.replace('\\', "/");
                return self.home.join(rest);
            }
        }
        PathBuf::from(input)
    }

    /// Resolve an input path to a canonical absolute path inside home.
    ///
    /// Expansion order: `~` shortcut, placeholder remap, absolutization
    /// (relative paths land under home), lexical `..`/`.` normalization,
    /// symlink resolution for the existing ancestor chain, containment
    /// check. Rejection is `access-denied` and is non-bypassable.
    pub fn resolve(&self, input: &str) -> Result<PathBuf, EngineError> {
        if input.is_empty() {
            return Err(EngineError::contract("empty path"));
        }

        // ~ expansion
        let expanded = if input == "~" {
            self.home.clone()
        } else if let Some(rest) = input.strip_prefix("~/") {
            self.home.join(rest)
        } else {
            self.remap_placeholder(input)
        };

        // Relative paths resolve under home, not the process cwd.
        let absolute = if expanded.is_absolute() {
            expanded
        } else {
            self.home.join(expanded)
        };

        let normalized = normalize_lexically(&absolute);
        let resolved = resolve_symlinks(&normalized);

        let home = std::fs::canonicalize(&self.home).unwrap_or_else(|_| self.home.clone());
        if resolved == home || resolved.starts_with(&home) {
            Ok(resolved)
        } else {
            Err(EngineError::access_denied(format!(
                "path outside home directory: {}",
                input
            )))
        }
    }
}

/// Squash `.` and `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor and append the remainder.
///
/// Write targets usually do not exist yet; their parent chain still must
/// not escape home through a symlink.
fn resolve_symlinks(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let mut ancestor = path.to_path_buf();
    let mut tail: Vec<std::ffi::OsString> = Vec::new();
    while let Some(parent) = ancestor.parent() {
        if let Some(name) = ancestor.file_name() {
            tail.push(name.to_os_string());
        }
        ancestor = parent.to_path_buf();
        if let Ok(canonical) = std::fs::canonicalize(&ancestor) {
            let mut out = canonical;
            for part in tail.iter().rev() {
                out.push(part);
            }
            return out;
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
#[path = "sandbox_tests.rs"]
mod tests;
