// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn args(value: serde_json::Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn sandbox() -> (Sandbox, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    (Sandbox::with_home(dir.path()), dir)
}

#[test]
fn file_operations_are_recognized() {
    assert!(is_file_operation("fs.write"));
    assert!(is_file_operation("fs.search"));
    assert!(!is_file_operation("shell.exec"));
    assert!(!is_file_operation("browser.open"));
}

#[test]
fn cloud_path_is_translated_preserving_basename() {
    let (sandbox, dir) = sandbox();
    let translated = translate_server_paths(
        &sandbox,
        &args(json!({ "path": "/home/appuser/Desktop/report.txt" })),
    );
    assert_eq!(
        translated["path"],
        dir.path().join("Desktop/report.txt").display().to_string()
    );
}

#[test]
fn local_paths_are_untouched() {
    let (sandbox, _dir) = sandbox();
    let translated = translate_server_paths(&sandbox, &args(json!({ "path": "~/t.txt" })));
    assert_eq!(translated["path"], "~/t.txt");
}

#[test]
fn directory_and_cwd_keys_are_translated() {
    let (sandbox, dir) = sandbox();
    let translated = translate_server_paths(
        &sandbox,
        &args(json!({ "directory": "/home/user/projects", "cwd": "/Users/user/code" })),
    );
    assert_eq!(
        translated["directory"],
        dir.path().join("projects").display().to_string()
    );
    assert_eq!(
        translated["cwd"],
        dir.path().join("code").display().to_string()
    );
}

#[test]
fn multi_file_entries_are_translated() {
    let (sandbox, dir) = sandbox();
    let translated = translate_server_paths(
        &sandbox,
        &args(json!({ "files": [
            { "path": "/home/appuser/site/index.html", "content": "x" },
            { "path": "~/site/app.js", "content": "y" },
        ]})),
    );
    let files = translated["files"].as_array().unwrap();
    assert_eq!(
        files[0]["path"],
        dir.path().join("site/index.html").display().to_string()
    );
    assert_eq!(files[1]["path"], "~/site/app.js");
}

#[test]
fn non_path_args_are_preserved() {
    let (sandbox, _dir) = sandbox();
    let translated = translate_server_paths(
        &sandbox,
        &args(json!({ "path": "/home/user/a.txt", "content": "body", "max_lines": 5 })),
    );
    assert_eq!(translated["content"], "body");
    assert_eq!(translated["max_lines"], 5);
}
