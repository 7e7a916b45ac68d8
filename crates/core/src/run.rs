// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run identifier and state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for an automation run.
    ///
    /// Assigned by the cloud planner; the engine never invents run ids.
    #[derive(Default)]
    pub struct RunId;
}

/// Status of a run through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, executor not yet looping
    Pending,
    /// Executor loop is active
    Running,
    /// Suspended, resumable
    Paused,
    /// Finished cleanly with a final response
    Complete,
    /// Exhausted retries or hit a fatal error
    Failed,
    /// Stopped by the user
    Stopped,
    /// Cancelled by the cloud
    Cancelled,
}

impl RunStatus {
    /// Check if this status is terminal (no further execution).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Complete | RunStatus::Failed | RunStatus::Stopped | RunStatus::Cancelled
        )
    }

    /// Check if this status counts as active for resume-on-startup.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RunStatus::Pending | RunStatus::Running | RunStatus::Paused
        )
    }

    /// Statuses that record a `completed_at` timestamp.
    pub fn records_completion(&self) -> bool {
        matches!(
            self,
            RunStatus::Complete | RunStatus::Failed | RunStatus::Stopped
        )
    }

    /// Parse from the persisted column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RunStatus::Pending),
            "running" => Some(RunStatus::Running),
            "paused" => Some(RunStatus::Paused),
            "complete" => Some(RunStatus::Complete),
            "failed" => Some(RunStatus::Failed),
            "stopped" => Some(RunStatus::Stopped),
            "cancelled" => Some(RunStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Paused => write!(f, "paused"),
            RunStatus::Complete => write!(f, "complete"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Stopped => write!(f, "stopped"),
            RunStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A persisted run row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: RunId,
    pub status: RunStatus,
    /// Index of the next step to execute (starts at 0)
    pub current_step_index: i64,
    /// Total step count if the plan is bounded; 0 for iterative plans
    pub total_steps: i64,
    /// Set only when the run completes cleanly
    pub final_response: Option<String>,
    /// Human description of the latest action, for UI display
    pub current_status_summary: Option<String>,
    /// First assistant message of the plan, if the cloud sent one
    pub initial_message: Option<String>,
    pub created_at_ms: u64,
    pub completed_at_ms: Option<u64>,
}

impl Run {
    /// Check if the run is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Partial update applied to a run row.
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct RunPatch {
    pub status: Option<RunStatus>,
    pub current_step_index: Option<i64>,
    pub total_steps: Option<i64>,
    pub final_response: Option<String>,
    pub current_status_summary: Option<String>,
    pub initial_message: Option<String>,
}

impl RunPatch {
    pub fn status(status: RunStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
