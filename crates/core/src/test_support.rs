// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders and helpers for other crates' tests.

use crate::run::{Run, RunId, RunStatus};
use crate::step::StepDescriptor;

/// Build a run row with sensible defaults.
pub fn run(id: &str) -> Run {
    Run {
        run_id: RunId::new(id),
        status: RunStatus::Pending,
        current_step_index: 0,
        total_steps: 0,
        final_response: None,
        current_status_summary: None,
        initial_message: None,
        created_at_ms: 1_000_000,
        completed_at_ms: None,
    }
}

/// Build a descriptor for an `fs.write` step.
pub fn write_step(path: &str, content: &str) -> StepDescriptor {
    let mut args = serde_json::Map::new();
    args.insert("path".into(), serde_json::Value::String(path.into()));
    args.insert("content".into(), serde_json::Value::String(content.into()));
    StepDescriptor::new("fs.write").with_args(args)
}

/// Build a descriptor for a `shell.exec` step.
pub fn shell_step(command: &str) -> StepDescriptor {
    let mut args = serde_json::Map::new();
    args.insert("command".into(), serde_json::Value::String(command.into()));
    StepDescriptor::new("shell.exec").with_args(args)
}
