// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tether_core::ErrorKind;

fn map(value: serde_json::Value) -> ArgMap {
    value.as_object().cloned().unwrap_or_default()
}

#[test]
fn safari_navigate_builds_open_location() {
    let script = build_script("safari.navigate", &map(json!({ "url": "https://example.com" })))
        .unwrap();
    assert!(script.contains("tell application \"Safari\""));
    assert!(script.contains("open location \"https://example.com\""));
}

#[test]
fn notes_create_includes_title_and_body() {
    let script = build_script(
        "notes.create",
        &map(json!({ "title": "Groceries", "body": "milk" })),
    )
    .unwrap();
    assert!(script.contains("name:\"Groceries\""));
    assert!(script.contains("body:\"milk\""));
}

#[test]
fn mail_send_requires_to_and_subject() {
    let err = build_script("mail.send", &map(json!({ "to": "a@b.c" }))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ContractViolation);
    assert!(err.message.contains("subject"));

    let script = build_script(
        "mail.send",
        &map(json!({ "to": "a@b.c", "subject": "Hi", "body": "text" })),
    )
    .unwrap();
    assert!(script.contains("address:\"a@b.c\""));
    assert!(script.contains("subject:\"Hi\""));
}

#[test]
fn calendar_event_requires_start_and_end() {
    let err = build_script(
        "calendar.create_event",
        &map(json!({ "title": "Standup", "start": "Monday" })),
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ContractViolation);
}

#[test]
fn reminders_due_date_is_optional() {
    let without = build_script("reminders.create", &map(json!({ "title": "Call" }))).unwrap();
    assert!(!without.contains("due date"));

    let with = build_script(
        "reminders.create",
        &map(json!({ "title": "Call", "due": "tomorrow 9:00" })),
    )
    .unwrap();
    assert!(with.contains("due date:date \"tomorrow 9:00\""));
}

#[test]
fn quotes_are_escaped() {
    let script = build_script(
        "notes.create",
        &map(json!({ "title": "say \"hi\"", "body": "a\\b" })),
    )
    .unwrap();
    assert!(script.contains("say \\\"hi\\\""));
    assert!(script.contains("a\\\\b"));
}

#[test]
fn unknown_action_is_contract_violation() {
    let err = build_script("spotify.play", &map(json!({}))).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ContractViolation);
}

#[cfg(not(target_os = "macos"))]
#[tokio::test]
async fn actions_are_unsupported_off_macos() {
    let result = run("finder.reveal", &map(json!({ "path": "~/x" }))).await;
    assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::Unsupported);
}
