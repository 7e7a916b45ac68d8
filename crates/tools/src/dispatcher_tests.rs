// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::input::FakeUserInput;
use serde_json::json;
use tether_core::ErrorKind;

fn map(value: serde_json::Value) -> crate::args::ArgMap {
    value.as_object().cloned().unwrap_or_default()
}

fn dispatcher() -> (Dispatcher, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = Dispatcher::new(
        Sandbox::with_home(dir.path()),
        Arc::new(FakeUserInput::default()),
    );
    (dispatcher, dir)
}

#[tokio::test]
async fn aliases_reach_the_same_handler() {
    let (dispatcher, _dir) = dispatcher();
    let args = map(json!({ "command": "echo same" }));

    let a = dispatcher.dispatch("shell_exec", &args).await;
    let b = dispatcher.dispatch("shell.command", &args).await;
    let c = dispatcher.dispatch("command", &args).await;

    assert!(a.success && b.success && c.success);
    assert_eq!(a.stdout, b.stdout);
    assert_eq!(b.stdout, c.stdout);
    assert_eq!(a.exit_code, c.exit_code);
}

#[tokio::test]
async fn unknown_tool_is_rejected_without_panic() {
    let (dispatcher, _dir) = dispatcher();
    let result = dispatcher.dispatch("quantum.entangle", &map(json!({}))).await;

    assert!(!result.success);
    let error = result.error.as_ref().unwrap();
    assert_eq!(error.kind, ErrorKind::ContractViolation);
    assert!(error.message.contains("quantum.entangle"));
}

#[tokio::test]
async fn think_records_text_and_succeeds() {
    let (dispatcher, _dir) = dispatcher();
    let result = dispatcher
        .dispatch("think", &map(json!({ "thought": "planning next move" })))
        .await;

    assert!(result.success);
    assert_eq!(result.stdout, "planning next move");
}

#[tokio::test]
async fn think_without_text_still_succeeds() {
    let (dispatcher, _dir) = dispatcher();
    let result = dispatcher.dispatch("think", &map(json!({}))).await;
    assert!(result.success);
}

#[tokio::test]
async fn user_input_forwards_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeUserInput::with_answers(vec!["blue".into()]);
    let dispatcher = Dispatcher::new(Sandbox::with_home(dir.path()), Arc::new(fake.clone()));

    let result = dispatcher
        .dispatch("user_input", &map(json!({ "prompt": "Favorite color?" })))
        .await;

    assert!(result.success);
    assert_eq!(result.stdout, "blue");
    assert_eq!(fake.prompts(), vec!["Favorite color?"]);
}

#[tokio::test]
async fn fs_route_goes_through_sandbox() {
    let (dispatcher, dir) = dispatcher();
    let result = dispatcher
        .dispatch("write_file", &map(json!({ "path": "~/t.txt", "content": "hi" })))
        .await;

    assert!(result.success);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("t.txt")).unwrap(),
        "hi"
    );

    let denied = dispatcher
        .dispatch("fs.write", &map(json!({ "path": "/etc/hosts", "content": "x" })))
        .await;
    assert_eq!(
        denied.error.as_ref().unwrap().kind,
        ErrorKind::AccessDenied
    );
}
