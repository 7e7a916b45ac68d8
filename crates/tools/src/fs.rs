// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem handlers: write, read, append, list, delete, search, find.
//!
//! Every path crosses the sandbox before any I/O happens.

use crate::args::{opt_str, opt_u64, require_str, ArgMap};
use crate::sandbox::Sandbox;
use serde_json::json;
use std::path::{Path, PathBuf};
use tether_core::{EngineError, ToolResult};

/// Default cap on lines returned by `fs.read`.
const READ_LINE_CAP: usize = 2000;

/// Depth cap for fallback search walks.
const SEARCH_MAX_DEPTH: usize = 6;

/// Result cap for search walks.
const SEARCH_MAX_RESULTS: usize = 100;

/// Files larger than this are skipped by content search.
const CONTENT_SEARCH_MAX_BYTES: u64 = 1024 * 1024;

/// `fs.write` - single `{path, content}` or multi-file `{files: [...]}`.
/// Parent directories are created as needed.
pub async fn write(sandbox: &Sandbox, args: &ArgMap) -> ToolResult {
    if let Some(files) = args.get("files").and_then(|v| v.as_array()) {
        let mut written = Vec::new();
        for entry in files {
            let Some(entry) = entry.as_object() else {
                return ToolResult::err(EngineError::contract("files entries must be objects"));
            };
            let path = match require_str(entry, "path") {
                Ok(p) => p,
                Err(e) => return ToolResult::err(e),
            };
            let content = match require_str(entry, "content") {
                Ok(c) => c,
                Err(e) => return ToolResult::err(e),
            };
            match write_one(sandbox, path, content).await {
                Ok(resolved) => written.push(resolved.display().to_string()),
                Err(e) => return ToolResult::err(e),
            }
        }
        return ToolResult::ok(format!("wrote {} files", written.len()))
            .with_evidence(json!({ "files": written }));
    }

    let path = match require_str(args, "path") {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };
    let content = match require_str(args, "content") {
        Ok(c) => c,
        Err(e) => return ToolResult::err(e),
    };

    match write_one(sandbox, path, content).await {
        Ok(resolved) => ToolResult::ok(format!("wrote {} bytes", content.len()))
            .with_evidence(json!({ "path": resolved.display().to_string() })),
        Err(e) => ToolResult::err(e),
    }
}

async fn write_one(sandbox: &Sandbox, path: &str, content: &str) -> Result<PathBuf, EngineError> {
    let resolved = sandbox.resolve(path)?;
    if let Some(parent) = resolved.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| EngineError::transient(format!("create parents: {e}")))?;
    }
    tokio::fs::write(&resolved, content)
        .await
        .map_err(|e| EngineError::transient(format!("write {}: {e}", resolved.display())))?;
    Ok(resolved)
}

/// `fs.read` - optionally capped to `max_lines`.
pub async fn read(sandbox: &Sandbox, args: &ArgMap) -> ToolResult {
    let path = match require_str(args, "path") {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };
    let resolved = match sandbox.resolve(path) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };

    let content = match tokio::fs::read_to_string(&resolved).await {
        Ok(content) => content,
        Err(e) => {
            return ToolResult::err(EngineError::tool_failure(format!(
                "read {}: {e}",
                resolved.display()
            )))
        }
    };

    let cap = opt_u64(args, "max_lines").map(|n| n as usize).unwrap_or(READ_LINE_CAP);
    let mut lines: Vec<&str> = content.lines().collect();
    let truncated = lines.len() > cap;
    if truncated {
        lines.truncate(cap);
    }

    ToolResult::ok(lines.join("\n")).with_evidence(json!({
        "path": resolved.display().to_string(),
        "truncated": truncated,
    }))
}

/// `fs.append` - creates the file if missing.
pub async fn append(sandbox: &Sandbox, args: &ArgMap) -> ToolResult {
    let path = match require_str(args, "path") {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };
    let content = match require_str(args, "content") {
        Ok(c) => c,
        Err(e) => return ToolResult::err(e),
    };
    let resolved = match sandbox.resolve(path) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };

    let append_result = async {
        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut existing = tokio::fs::read(&resolved).await.unwrap_or_default();
        existing.extend_from_slice(content.as_bytes());
        tokio::fs::write(&resolved, existing).await
    }
    .await;

    match append_result {
        Ok(()) => ToolResult::ok(format!("appended {} bytes", content.len()))
            .with_evidence(json!({ "path": resolved.display().to_string() })),
        Err(e) => ToolResult::err(EngineError::transient(format!(
            "append {}: {e}",
            resolved.display()
        ))),
    }
}

/// `fs.list` - entries with name, type, size and mtime.
pub async fn list(sandbox: &Sandbox, args: &ArgMap) -> ToolResult {
    let path = opt_str(args, "path").unwrap_or("~");
    let resolved = match sandbox.resolve(path) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };

    let mut dir = match tokio::fs::read_dir(&resolved).await {
        Ok(dir) => dir,
        Err(e) => {
            return ToolResult::err(EngineError::tool_failure(format!(
                "list {}: {e}",
                resolved.display()
            )))
        }
    };

    let mut entries = Vec::new();
    loop {
        match dir.next_entry().await {
            Ok(Some(entry)) => {
                let name = entry.file_name().to_string_lossy().into_owned();
                let (kind, size, mtime_ms) = match entry.metadata().await {
                    Ok(meta) => {
                        let kind = if meta.is_dir() { "dir" } else { "file" };
                        let mtime_ms = meta
                            .modified()
                            .ok()
                            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                            .map(|d| d.as_millis() as u64);
                        (kind, meta.len(), mtime_ms)
                    }
                    Err(_) => ("unknown", 0, None),
                };
                entries.push(json!({
                    "name": name,
                    "type": kind,
                    "size": size,
                    "mtime_ms": mtime_ms,
                }));
            }
            Ok(None) => break,
            Err(e) => {
                return ToolResult::err(EngineError::transient(format!("list: {e}")));
            }
        }
    }

    entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
    let listing = entries
        .iter()
        .filter_map(|e| e["name"].as_str())
        .collect::<Vec<_>>()
        .join("\n");

    ToolResult::ok(listing).with_evidence(json!({ "entries": entries }))
}

/// `fs.delete` - removes a file or an empty directory.
pub async fn delete(sandbox: &Sandbox, args: &ArgMap) -> ToolResult {
    let path = match require_str(args, "path") {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };
    let resolved = match sandbox.resolve(path) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };

    let outcome = match tokio::fs::metadata(&resolved).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir(&resolved).await,
        Ok(_) => tokio::fs::remove_file(&resolved).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => ToolResult::ok(format!("deleted {}", resolved.display())),
        Err(e) => ToolResult::err(EngineError::tool_failure(format!(
            "delete {}: {e}",
            resolved.display()
        ))),
    }
}

/// `fs.search` / `fs.find` - name or content search under a directory.
///
/// On macOS, name search delegates to the Spotlight index; everywhere else
/// (and as fallback) a depth-capped walk is used. `semantic` search needs
/// the cloud's embedding service and is unsupported on the host.
pub async fn search(sandbox: &Sandbox, args: &ArgMap) -> ToolResult {
    let query = match require_str(args, "query") {
        Ok(q) => q.to_string(),
        Err(e) => return ToolResult::err(e),
    };
    let search_type = opt_str(args, "search_type").unwrap_or("name");
    let directory = opt_str(args, "directory").unwrap_or("~");
    let root = match sandbox.resolve(directory) {
        Ok(p) => p,
        Err(e) => return ToolResult::err(e),
    };

    match search_type {
        "name" => {
            #[cfg(target_os = "macos")]
            {
                if let Some(result) = spotlight_search(&root, &query).await {
                    return result;
                }
            }
            walk_search(&root, &query, false).await
        }
        "content" => walk_search(&root, &query, true).await,
        "semantic" => ToolResult::err(EngineError::unsupported(
            "semantic search is not available on the host",
        )),
        other => ToolResult::err(EngineError::contract(format!(
            "unknown search_type: {other}"
        ))),
    }
}

#[cfg(target_os = "macos")]
async fn spotlight_search(root: &Path, query: &str) -> Option<ToolResult> {
    use crate::subprocess::{run_with_timeout, DESKTOP_TIMEOUT};

    let mut cmd = tokio::process::Command::new("mdfind");
    cmd.arg("-onlyin").arg(root).arg("-name").arg(query);
    let output = run_with_timeout(cmd, DESKTOP_TIMEOUT, "mdfind").await.ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    // An empty answer may just mean the directory is not indexed; let the
    // walk fallback decide.
    if stdout.trim().is_empty() {
        return None;
    }
    let matches: Vec<&str> = stdout.lines().take(SEARCH_MAX_RESULTS).collect();
    Some(
        ToolResult::ok(matches.join("\n"))
            .with_evidence(json!({ "count": matches.len(), "indexed": true })),
    )
}

async fn walk_search(root: &Path, query: &str, content: bool) -> ToolResult {
    let root = root.to_owned();
    let query = query.to_owned();

    // The walk is synchronous filesystem work; keep it off the runtime.
    let matches = tokio::task::spawn_blocking(move || {
        let mut matches = Vec::new();
        walk(&root, &query, content, 0, &mut matches);
        matches
    })
    .await;

    match matches {
        Ok(matches) => ToolResult::ok(matches.join("\n"))
            .with_evidence(json!({ "count": matches.len(), "indexed": false })),
        Err(e) => ToolResult::err(EngineError::transient(format!("search task failed: {e}"))),
    }
}

fn walk(dir: &Path, query: &str, content: bool, depth: usize, matches: &mut Vec<String>) {
    if depth > SEARCH_MAX_DEPTH || matches.len() >= SEARCH_MAX_RESULTS {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        if matches.len() >= SEARCH_MAX_RESULTS {
            return;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            walk(&path, query, content, depth + 1, matches);
        } else if content {
            let small = entry
                .metadata()
                .map(|m| m.len() <= CONTENT_SEARCH_MAX_BYTES)
                .unwrap_or(false);
            if small {
                if let Ok(text) = std::fs::read_to_string(&path) {
                    if text.contains(query) {
                        matches.push(path.display().to_string());
                    }
                }
            }
        } else if name.contains(query) {
            matches.push(path.display().to_string());
        }
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
