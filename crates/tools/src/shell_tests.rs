// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tether_core::ErrorKind;
use yare::parameterized;

fn args(command: &str) -> ArgMap {
    let mut map = ArgMap::new();
    map.insert("command".into(), serde_json::Value::String(command.into()));
    map
}

fn sandbox() -> (Sandbox, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    (Sandbox::with_home(dir.path()), dir)
}

#[parameterized(
    npm = { "npm install express", true },
    pip = { "pip install requests", true },
    cargo = { "cd app && cargo build --release", true },
    clone = { "git clone https://example.com/repo.git", true },
    ls = { "ls -la", false },
    echo = { "echo install", false },
)]
fn long_running_detection(command: &str, long: bool) {
    assert_eq!(is_long_running(command), long);
}

#[parameterized(
    tilde = { "find ~ -name \"notes.txt\"" },
    home_var = { "find $HOME -name notes.txt" },
)]
fn home_find_is_rewritten(command: &str) {
    let (spotlight, fallback) = rewrite_home_find(command, "/Users/me").unwrap();
    assert!(spotlight.starts_with("mdfind -onlyin \"/Users/me\""));
    assert!(spotlight.contains("notes.txt"));
    assert!(fallback.contains("-maxdepth 6"));
}

#[parameterized(
    other_root = { "find /tmp -name x" },
    extra_predicates = { "find ~ -name x -type f" },
    not_find = { "grep -r name ~" },
)]
fn non_candidates_are_left_alone(command: &str) {
    assert!(rewrite_home_find(command, "/Users/me").is_none());
}

#[tokio::test]
async fn exec_captures_stdout_and_exit_code() {
    let (sandbox, _dir) = sandbox();
    let result = exec(&sandbox, &args("echo hi; echo err >&2")).await;

    assert!(result.success);
    assert_eq!(result.stdout.trim(), "hi");
    assert_eq!(result.stderr.trim(), "err");
    assert_eq!(result.exit_code, Some(0));
    assert_eq!(result.evidence.as_ref().unwrap()["status"], "completed");
}

#[tokio::test]
async fn exec_reports_failure_exit_code() {
    let (sandbox, _dir) = sandbox();
    let result = exec(&sandbox, &args("exit 3")).await;

    assert!(!result.success);
    assert_eq!(result.exit_code, Some(3));
    assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::ToolFailure);
    assert_eq!(result.evidence.as_ref().unwrap()["status"], "failed");
}

#[tokio::test]
async fn exec_times_out() {
    let (sandbox, _dir) = sandbox();
    let mut map = args("sleep 10");
    map.insert("timeout_sec".into(), serde_json::json!(1));
    let result = exec(&sandbox, &map).await;

    assert!(!result.success);
    assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::Timeout);
    assert_eq!(result.evidence.as_ref().unwrap()["status"], "timeout");
}

#[tokio::test]
async fn exec_missing_command_is_contract_violation() {
    let (sandbox, _dir) = sandbox();
    let result = exec(&sandbox, &ArgMap::new()).await;
    assert_eq!(
        result.error.as_ref().unwrap().kind,
        ErrorKind::ContractViolation
    );
}

#[tokio::test]
async fn exec_runs_in_sandboxed_cwd() {
    let (sandbox, dir) = sandbox();
    let mut map = args("pwd");
    map.insert("cwd".into(), serde_json::json!("~"));
    let result = exec(&sandbox, &map).await;

    assert!(result.success);
    let canonical_home = std::fs::canonicalize(dir.path()).unwrap();
    assert_eq!(result.stdout.trim(), canonical_home.to_string_lossy());
}

#[tokio::test]
async fn exec_rejects_cwd_outside_home() {
    let (sandbox, _dir) = sandbox();
    let mut map = args("pwd");
    map.insert("cwd".into(), serde_json::json!("/etc"));
    let result = exec(&sandbox, &map).await;
    assert_eq!(
        result.error.as_ref().unwrap().kind,
        ErrorKind::AccessDenied
    );
}

#[tokio::test]
async fn exec_passes_env() {
    let (sandbox, _dir) = sandbox();
    let mut map = args("echo $TETHER_TEST_VAR");
    map.insert(
        "env".into(),
        serde_json::json!({ "TETHER_TEST_VAR": "visible" }),
    );
    let result = exec(&sandbox, &map).await;
    assert_eq!(result.stdout.trim(), "visible");
}
