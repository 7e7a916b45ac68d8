// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Uniform tool results and persisted step results.

use crate::error::EngineError;
use crate::run::RunId;
use serde::{Deserialize, Serialize};

/// The uniform outcome every tool handler returns.
///
/// Handlers never raise across the dispatcher boundary; failures are
/// encoded in `success` and `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EngineError>,
    /// Tool-specific structured data (screenshot bytes, file lists, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<serde_json::Value>,
}

impl ToolResult {
    /// Successful result carrying stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: Some(0),
            error: None,
            evidence: None,
        }
    }

    /// Failed result carrying a labeled error.
    pub fn err(error: EngineError) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: error.message.clone(),
            exit_code: None,
            error: Some(error),
            evidence: None,
        }
    }

    pub fn with_evidence(mut self, evidence: serde_json::Value) -> Self {
        self.evidence = Some(evidence);
        self
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }
}

/// The persisted outcome of a step's attempt chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub result_id: i64,
    pub step_id: i64,
    pub run_id: RunId,
    pub step_index: i64,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub attempts: u32,
    pub execution_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EngineError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<serde_json::Value>,
    /// Set once, when the cloud accepts the report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at_ms: Option<u64>,
}

impl StepResult {
    /// Build a persisted result from a tool outcome.
    pub fn from_tool(
        run_id: RunId,
        step_id: i64,
        step_index: i64,
        attempts: u32,
        execution_time_ms: u64,
        tool: ToolResult,
    ) -> Self {
        Self {
            result_id: 0,
            step_id,
            run_id,
            step_index,
            success: tool.success,
            stdout: tool.stdout,
            stderr: tool.stderr,
            exit_code: tool.exit_code,
            attempts,
            execution_time_ms,
            error: tool.error,
            evidence: tool.evidence,
            synced_at_ms: None,
        }
    }
}
