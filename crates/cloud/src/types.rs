// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloud protocol DTOs.
//!
//! Enums are tolerant of unknown variants: new server-side statuses must
//! not break deployed engines, so anything unrecognized maps to `Other`
//! and the executor treats it as "sleep one interval and retry".

use serde::{Deserialize, Serialize};
use tether_core::{StepDescriptor, SystemContext};

/// Status of a fetch-next-step response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStepStatus {
    /// A step is available
    Ready,
    /// The plan finished; `final_response` is set
    Complete,
    /// The cloud cancelled the run
    Cancelled,
    /// The run is unknown to the cloud
    NotFound,
    /// Engine and cloud disagree on progress; resync from
    /// `expected_last_completed`
    OutOfSync,
    /// Anything newer than this engine
    #[serde(other)]
    Other,
}

/// Response to `GET /api/v2/runs/{run_id}/next-step`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextStepResponse {
    pub status: NextStepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<StepDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_last_completed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_last_completed: Option<i64>,
    /// Set when the returned step is a one-shot recovery for a failure
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub adaptive_recovery: bool,
}

impl NextStepResponse {
    pub fn with_status(status: NextStepStatus) -> Self {
        Self {
            status,
            step_index: None,
            step: None,
            total_steps: None,
            final_response: None,
            status_summary: None,
            initial_message: None,
            expected_last_completed: None,
            received_last_completed: None,
            adaptive_recovery: false,
        }
    }
}

/// Acknowledgement status for a reported result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    Accepted,
    NeedsRecovery,
    Failed,
    #[serde(other)]
    Error,
}

/// Response to `POST .../steps/{step_index}/result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportAck {
    pub status: ReportOutcome,
}

/// Request body for `POST .../steps/{step_id}/generate-args`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateArgsRequest {
    pub step: StepDescriptor,
    pub context: SystemContext,
    pub previous_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response to a generate-args request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateArgsResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
