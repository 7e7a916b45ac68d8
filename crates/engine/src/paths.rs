// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-path translation.
//!
//! Plans are synthesized against the cloud's own filesystem layout
//! (`/home/appuser/...`). Before dispatching a file operation, every
//! path-valued argument is remapped to the equivalent location under the
//! local home, preserving the remainder. The sandbox applies the same
//! remap defensively on resolve; this pass makes the translation explicit
//! and keeps persisted descriptors host-accurate.

use serde_json::{Map, Value};
use tether_tools::Sandbox;

/// Argument keys that carry paths.
const PATH_KEYS: &[&str] = &["path", "directory", "cwd"];

/// Tools whose arguments go through path translation.
pub fn is_file_operation(tool_name: &str) -> bool {
    tool_name.starts_with("fs.")
}

/// Rewrite path-valued arguments from server-side to local form.
pub fn translate_server_paths(sandbox: &Sandbox, args: &Map<String, Value>) -> Map<String, Value> {
    let mut out = args.clone();

    for key in PATH_KEYS {
        let remapped = match out.get(*key) {
            Some(Value::String(path)) => {
                Some(sandbox.remap_placeholder(path).display().to_string())
            }
            _ => None,
        };
        if let Some(remapped) = remapped {
            out.insert((*key).to_string(), Value::String(remapped));
        }
    }

    // Multi-file writes carry paths one level down.
    if let Some(Value::Array(files)) = out.get_mut("files") {
        for file in files.iter_mut() {
            if let Some(entry) = file.as_object_mut() {
                let remapped = match entry.get("path") {
                    Some(Value::String(path)) => {
                        Some(sandbox.remap_placeholder(path).display().to_string())
                    }
                    _ => None,
                };
                if let Some(remapped) = remapped {
                    entry.insert("path".to_string(), Value::String(remapped));
                }
            }
        }
    }

    out
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
