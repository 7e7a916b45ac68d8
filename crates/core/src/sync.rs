// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable sync-queue items for deferred cloud reporting.

use crate::run::RunId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The cloud call a queued item stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    ReportResult,
    UpdateStatus,
    CompleteRun,
}

impl SyncAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "report_result" => Some(SyncAction::ReportResult),
            "update_status" => Some(SyncAction::UpdateStatus),
            "complete_run" => Some(SyncAction::CompleteRun),
            _ => None,
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::ReportResult => write!(f, "report_result"),
            SyncAction::UpdateStatus => write!(f, "update_status"),
            SyncAction::CompleteRun => write!(f, "complete_run"),
        }
    }
}

/// A persisted sync-queue row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncItem {
    pub queue_id: i64,
    pub run_id: RunId,
    pub action: SyncAction,
    pub payload: serde_json::Value,
    /// Lower value is served sooner
    pub priority: i64,
    pub attempts: u32,
    pub next_attempt_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
