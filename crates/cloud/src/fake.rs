// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted cloud client for tests.

use crate::client::{CloudClient, CloudError};
use crate::types::{
    GenerateArgsRequest, GenerateArgsResponse, NextStepResponse, ReportAck, ReportOutcome,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tether_core::{RunId, StepResult};

/// A recorded call, for assertions on ordering and payloads.
#[derive(Debug, Clone)]
pub enum CloudCall {
    NextStep {
        run_id: RunId,
        last_completed: i64,
    },
    ReportResult {
        run_id: RunId,
        step_index: i64,
        success: bool,
    },
    GenerateArgs {
        run_id: RunId,
        step_id: i64,
        error: Option<String>,
    },
}

#[derive(Default)]
struct Script {
    next_steps: VecDeque<Result<NextStepResponse, String>>,
    reports: VecDeque<Result<ReportAck, String>>,
    generate_args: VecDeque<Result<GenerateArgsResponse, String>>,
}

/// Cloud client answering from pre-loaded scripts.
///
/// Each endpoint pops from its own queue; an exhausted queue answers a
/// transport error for `next_step`/`generate_args` and `accepted` for
/// reports (the common case in tests).
#[derive(Clone, Default)]
pub struct FakeCloudClient {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<CloudCall>>>,
    healthy: Arc<Mutex<bool>>,
    reports_fail: Arc<Mutex<bool>>,
}

impl FakeCloudClient {
    pub fn new() -> Self {
        let fake = Self::default();
        *fake.healthy.lock() = true;
        fake
    }

    pub fn push_next_step(&self, response: NextStepResponse) {
        self.script.lock().next_steps.push_back(Ok(response));
    }

    pub fn push_next_step_error(&self, message: &str) {
        self.script
            .lock()
            .next_steps
            .push_back(Err(message.to_string()));
    }

    pub fn push_report(&self, ack: ReportAck) {
        self.script.lock().reports.push_back(Ok(ack));
    }

    pub fn push_generate_args(&self, response: GenerateArgsResponse) {
        self.script.lock().generate_args.push_back(Ok(response));
    }

    pub fn push_generate_args_error(&self, message: &str) {
        self.script
            .lock()
            .generate_args
            .push_back(Err(message.to_string()));
    }

    /// Make every report fail at the transport level (offline mode).
    pub fn set_reports_fail(&self, fail: bool) {
        *self.reports_fail.lock() = fail;
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock() = healthy;
    }

    pub fn calls(&self) -> Vec<CloudCall> {
        self.calls.lock().clone()
    }

    pub fn report_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, CloudCall::ReportResult { .. }))
            .count()
    }
}

fn transport_error(message: &str) -> CloudError {
    CloudError::BadResponse {
        status: 503,
        body: message.to_string(),
    }
}

#[async_trait]
impl CloudClient for FakeCloudClient {
    async fn next_step(
        &self,
        run_id: &RunId,
        last_completed: i64,
    ) -> Result<NextStepResponse, CloudError> {
        self.calls.lock().push(CloudCall::NextStep {
            run_id: run_id.clone(),
            last_completed,
        });
        match self.script.lock().next_steps.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(transport_error(&message)),
            None => Err(transport_error("next-step script exhausted")),
        }
    }

    async fn report_result(
        &self,
        run_id: &RunId,
        step_index: i64,
        result: &StepResult,
    ) -> Result<ReportAck, CloudError> {
        self.calls.lock().push(CloudCall::ReportResult {
            run_id: run_id.clone(),
            step_index,
            success: result.success,
        });
        if *self.reports_fail.lock() {
            return Err(transport_error("reports offline"));
        }
        match self.script.lock().reports.pop_front() {
            Some(Ok(ack)) => Ok(ack),
            Some(Err(message)) => Err(transport_error(&message)),
            None => Ok(ReportAck {
                status: ReportOutcome::Accepted,
            }),
        }
    }

    async fn generate_args(
        &self,
        run_id: &RunId,
        step_id: i64,
        request: &GenerateArgsRequest,
    ) -> Result<GenerateArgsResponse, CloudError> {
        self.calls.lock().push(CloudCall::GenerateArgs {
            run_id: run_id.clone(),
            step_id,
            error: request.error.clone(),
        });
        match self.script.lock().generate_args.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(transport_error(&message)),
            None => Err(transport_error("generate-args script exhausted")),
        }
    }

    async fn health(&self) -> bool {
        *self.healthy.lock()
    }
}
