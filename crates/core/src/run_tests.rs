// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    complete = { RunStatus::Complete, true },
    failed = { RunStatus::Failed, true },
    stopped = { RunStatus::Stopped, true },
    cancelled = { RunStatus::Cancelled, true },
    pending = { RunStatus::Pending, false },
    running = { RunStatus::Running, false },
    paused = { RunStatus::Paused, false },
)]
fn terminal_statuses(status: RunStatus, terminal: bool) {
    assert_eq!(status.is_terminal(), terminal);
    assert_eq!(status.is_active(), !terminal);
}

#[parameterized(
    complete = { RunStatus::Complete, true },
    failed = { RunStatus::Failed, true },
    stopped = { RunStatus::Stopped, true },
    cancelled = { RunStatus::Cancelled, false },
)]
fn completion_timestamp_statuses(status: RunStatus, records: bool) {
    assert_eq!(status.records_completion(), records);
}

#[test]
fn parse_round_trips_display() {
    for status in [
        RunStatus::Pending,
        RunStatus::Running,
        RunStatus::Paused,
        RunStatus::Complete,
        RunStatus::Failed,
        RunStatus::Stopped,
        RunStatus::Cancelled,
    ] {
        assert_eq!(RunStatus::parse(&status.to_string()), Some(status));
    }
}

#[test]
fn parse_rejects_unknown() {
    assert_eq!(RunStatus::parse("exploded"), None);
}

#[test]
fn serde_uses_snake_case() {
    let json = serde_json::to_string(&RunStatus::Complete).unwrap();
    assert_eq!(json, "\"complete\"");
}
