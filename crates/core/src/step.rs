// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step descriptor and status transitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Persisted, not yet started
    Pending,
    /// An attempt is in flight
    Running,
    /// Finished successfully
    Done,
    /// Exhausted its attempts
    Failed,
}

impl StepStatus {
    /// Whether a transition from `self` to `next` is allowed.
    ///
    /// Steps only move forward: `pending → running → {done, failed}`.
    /// The one backward edge, `running → pending`, is reserved for startup
    /// demotion of steps orphaned by a crash.
    pub fn can_transition(&self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (StepStatus::Pending, StepStatus::Running)
                | (StepStatus::Running, StepStatus::Done)
                | (StepStatus::Running, StepStatus::Failed)
                | (StepStatus::Running, StepStatus::Pending)
        )
    }

    /// Parse from the persisted column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StepStatus::Pending),
            "running" => Some(StepStatus::Running),
            "done" => Some(StepStatus::Done),
            "failed" => Some(StepStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Done => write!(f, "done"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The tool invocation a step carries, as received from the cloud.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub tool_name: String,
    /// Named options for the handler. Absent until generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Map<String, serde_json::Value>>,
    /// Human description of the action, shown in the UI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    /// Per-step attempt timeout override, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u64>,
}

impl StepDescriptor {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            args: None,
            description: None,
            intent: None,
            goal: None,
            timeout_sec: None,
        }
    }

    pub fn with_args(mut self, args: serde_json::Map<String, serde_json::Value>) -> Self {
        self.args = Some(args);
        self
    }
}

/// A persisted step row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Store-assigned rowid, unique within the database
    pub step_id: i64,
    pub run_id: super::RunId,
    pub step_index: i64,
    pub descriptor: StepDescriptor,
    pub status: StepStatus,
    pub started_at_ms: Option<u64>,
    pub completed_at_ms: Option<u64>,
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
