// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pull executor: one loop per run.
//!
//! Alternates between executing locally persisted pending steps and
//! pulling new work from the cloud, persisting at every transition. A
//! step's result is always reported (or durably queued and flushed)
//! before the next step is fetched, so engine and cloud never disagree
//! about progress for long.

use crate::paths::{is_file_operation, translate_server_paths};
use crate::placeholder::resolve_placeholders;
use crate::RuntimeError;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tether_cloud::{
    CloudClient, GenerateArgsRequest, NextStepResponse, NextStepStatus, ReportOutcome,
};
use tether_core::{
    Clock, EngineError, ErrorKind, RunId, RunPatch, RunStatus, Step, StepDescriptor, StepResult,
    StepStatus, SyncAction, SystemContext, ToolResult,
};
use tether_store::StateStore;
use tether_tools::{canonical_name, Dispatcher};
use tokio::sync::watch;

/// Tunables for the executor and its workers.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Attempts per step before it is marked failed.
    pub max_retries: u32,
    /// Default wall-clock bound per attempt (step `timeout_sec` overrides).
    pub attempt_timeout: Duration,
    /// Sleep between cloud polls and sync-gate checks.
    pub poll_interval: Duration,
    /// First retry backoff; doubles per attempt.
    pub backoff_base: Duration,
    /// Sync worker flush interval.
    pub sync_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            attempt_timeout: Duration::from_secs(90),
            poll_interval: Duration::from_secs(2),
            backoff_base: Duration::from_secs(1),
            sync_interval: Duration::from_secs(5),
        }
    }
}

/// Cooperative stop flag checked between phases and selected against
/// in-flight attempts.
#[derive(Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the signal fires (immediately if already fired).
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // wait_for returns immediately when the current value matches.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

/// What `drive` decided about a finished loop iteration.
enum StepFlow {
    Continue,
    Stopped,
}

/// Executes one run to completion.
pub struct RunExecutor<C: CloudClient, K: Clock> {
    run_id: RunId,
    store: Arc<StateStore>,
    cloud: Arc<C>,
    dispatcher: Arc<Dispatcher>,
    clock: K,
    config: EngineConfig,
    context: SystemContext,
    stop: StopSignal,
}

impl<C: CloudClient, K: Clock> RunExecutor<C, K> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: RunId,
        store: Arc<StateStore>,
        cloud: Arc<C>,
        dispatcher: Arc<Dispatcher>,
        clock: K,
        config: EngineConfig,
        context: SystemContext,
    ) -> Self {
        Self {
            run_id,
            store,
            cloud,
            dispatcher,
            clock,
            config,
            context,
            stop: StopSignal::new(),
        }
    }

    /// Handle for stopping this run from outside.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Drive the run until a terminal state. Never panics; internal
    /// errors fail the run with a human-readable summary.
    pub async fn run(&self) -> RunStatus {
        match self.drive().await {
            Ok(status) => {
                tracing::info!(run_id = %self.run_id, %status, "run finished");
                status
            }
            Err(e) => {
                tracing::error!(run_id = %self.run_id, error = %e, "run aborted");
                let _ = self.finish_failed(&format!("engine error: {e}"));
                RunStatus::Failed
            }
        }
    }

    async fn drive(&self) -> Result<RunStatus, RuntimeError> {
        let run = self
            .store
            .create_run(&self.run_id, 0, self.clock.epoch_ms())?;
        if run.status.is_terminal() {
            return Ok(run.status);
        }
        self.store.update_run(
            &self.run_id,
            &RunPatch::status(RunStatus::Running),
            self.clock.epoch_ms(),
        )?;

        let mut last_completed: i64 = run.current_step_index - 1;
        // Step index whose report went to the sync queue; gates fetches.
        let mut await_sync: Option<i64> = None;
        // Step index that failed and is waiting for an adaptive recovery.
        let mut failed_index: Option<i64> = None;
        // Indexes that already consumed their one recovery.
        let mut recovered: HashSet<i64> = HashSet::new();

        loop {
            if self.stop.is_stopped() {
                return self.finish_stopped();
            }

            // Phase 1: execute locally persisted work.
            if let Some(step) = self.store.get_next_pending_step(&self.run_id)? {
                let Some(result) = self.execute_step(&step).await? else {
                    return self.finish_stopped();
                };

                if self.report_result(&step, &result).await? {
                    await_sync = Some(step.step_index);
                }

                if result.success {
                    self.store.update_run(
                        &self.run_id,
                        &RunPatch {
                            current_step_index: Some(step.step_index + 1),
                            ..RunPatch::default()
                        },
                        self.clock.epoch_ms(),
                    )?;
                    last_completed = step.step_index;
                    failed_index = None;
                } else if recovered.contains(&step.step_index) {
                    return self.finish_failed(&format!(
                        "step {} failed after adaptive recovery: {}",
                        step.step_index,
                        result.stderr
                    ));
                } else {
                    failed_index = Some(step.step_index);
                }
                continue;
            }

            // Phase 2: report-before-next. A queued report must flush
            // before any further fetch.
            if let Some(index) = await_sync {
                let synced = self
                    .store
                    .get_step_result(&self.run_id, index)?
                    .map(|r| r.synced_at_ms.is_some())
                    .unwrap_or(true);
                if !synced {
                    match self.sleep_poll().await {
                        StepFlow::Stopped => return self.finish_stopped(),
                        StepFlow::Continue => continue,
                    }
                }
                await_sync = None;
            }

            // Phase 3: pull the next instruction from the cloud.
            let response = match self.cloud.next_step(&self.run_id, last_completed).await {
                Ok(response) => response,
                Err(e) => {
                    if let Some(index) = failed_index {
                        return self.finish_failed(&format!(
                            "step {index} failed and no recovery was available: {e}"
                        ));
                    }
                    tracing::warn!(run_id = %self.run_id, error = %e, "next-step fetch failed");
                    match self.sleep_poll().await {
                        StepFlow::Stopped => return self.finish_stopped(),
                        StepFlow::Continue => continue,
                    }
                }
            };

            match response.status {
                NextStepStatus::Complete => {
                    self.store.update_run(
                        &self.run_id,
                        &RunPatch {
                            status: Some(RunStatus::Complete),
                            final_response: Some(
                                response.final_response.clone().unwrap_or_default(),
                            ),
                            current_status_summary: response.status_summary.clone(),
                            ..RunPatch::default()
                        },
                        self.clock.epoch_ms(),
                    )?;
                    return Ok(RunStatus::Complete);
                }

                NextStepStatus::Cancelled => {
                    self.store.update_run(
                        &self.run_id,
                        &RunPatch {
                            status: Some(RunStatus::Cancelled),
                            current_status_summary: Some("cancelled by cloud".to_string()),
                            ..RunPatch::default()
                        },
                        self.clock.epoch_ms(),
                    )?;
                    return Ok(RunStatus::Cancelled);
                }

                NextStepStatus::NotFound => {
                    tracing::warn!(run_id = %self.run_id, "run unknown to cloud; leaving loop");
                    let status = self
                        .store
                        .get_run(&self.run_id)?
                        .map(|r| r.status)
                        .unwrap_or(RunStatus::Failed);
                    return Ok(status);
                }

                NextStepStatus::OutOfSync => {
                    // The only place index regression is permitted.
                    if let Some(expected) = response.expected_last_completed {
                        tracing::warn!(
                            run_id = %self.run_id,
                            local = last_completed,
                            expected,
                            "resyncing with cloud progress"
                        );
                        last_completed = expected;
                        self.store.update_run(
                            &self.run_id,
                            &RunPatch {
                                current_step_index: Some(expected + 1),
                                ..RunPatch::default()
                            },
                            self.clock.epoch_ms(),
                        )?;
                    }
                    continue;
                }

                NextStepStatus::Ready => {
                    let Some(descriptor) = response.step.clone() else {
                        tracing::warn!(run_id = %self.run_id, "ready response without step");
                        match self.sleep_poll().await {
                            StepFlow::Stopped => return self.finish_stopped(),
                            StepFlow::Continue => continue,
                        }
                    };
                    let index = response.step_index.unwrap_or(last_completed + 1);

                    match self.store.get_step(&self.run_id, index)? {
                        Some(existing) if existing.status == StepStatus::Failed => {
                            if recovered.contains(&index) {
                                return self.finish_failed(&format!(
                                    "step {index} exhausted its adaptive recovery"
                                ));
                            }
                            self.store
                                .reset_step_for_recovery(existing.step_id, &descriptor)?;
                            recovered.insert(index);
                        }
                        Some(existing) if existing.status == StepStatus::Done => {
                            // Cloud lagging behind a reported result; give
                            // the report time to land.
                            match self.sleep_poll().await {
                                StepFlow::Stopped => return self.finish_stopped(),
                                StepFlow::Continue => continue,
                            }
                        }
                        Some(_) => {}
                        None => {
                            self.store.save_step(
                                &self.run_id,
                                index,
                                &descriptor,
                                self.clock.epoch_ms(),
                            )?;
                        }
                    }

                    failed_index = None;
                    self.apply_plan_metadata(&response)?;
                    continue;
                }

                NextStepStatus::Other => {
                    match self.sleep_poll().await {
                        StepFlow::Stopped => return self.finish_stopped(),
                        StepFlow::Continue => continue,
                    }
                }
            }
        }
    }

    /// Execute a step under the retry envelope.
    ///
    /// Returns `None` when a stop was observed mid-attempt; the step is
    /// demoted back to pending for the next start.
    async fn execute_step(&self, step: &Step) -> Result<Option<StepResult>, RuntimeError> {
        self.store
            .update_step_status(step.step_id, StepStatus::Running, self.clock.epoch_ms())?;

        let started = std::time::Instant::now();
        let mut descriptor = step.descriptor.clone();
        let attempt_timeout = descriptor
            .timeout_sec
            .map(Duration::from_secs)
            .unwrap_or(self.config.attempt_timeout);

        let mut attempts: u32 = 0;
        let mut last_error: Option<EngineError> = None;
        let mut outcome: Option<ToolResult> = None;

        while attempts < self.config.max_retries {
            attempts += 1;

            // Regenerate args before the first attempt when none exist,
            // and before any retry that follows an error.
            if descriptor.args.is_none() || last_error.is_some() {
                match self.generate_args(step, &descriptor, last_error.as_ref()).await {
                    Some(args) => {
                        descriptor.args = Some(args);
                        self.store
                            .update_step_descriptor(step.step_id, &descriptor)?;
                    }
                    None if descriptor.args.is_none() => {
                        outcome = Some(ToolResult::err(EngineError::contract(
                            "no arguments available and generation failed",
                        )));
                        break;
                    }
                    None => {}
                }
            }

            let args = self.prepare_args(&descriptor, step)?;

            let dispatched = tokio::select! {
                _ = self.stop.wait() => {
                    // Best-effort cancel: abandon the attempt, rearm the step.
                    self.store.update_step_status(
                        step.step_id,
                        StepStatus::Pending,
                        self.clock.epoch_ms(),
                    )?;
                    return Ok(None);
                }
                result = tokio::time::timeout(
                    attempt_timeout,
                    self.dispatcher.dispatch(&descriptor.tool_name, &args),
                ) => result,
            };

            let tool_result = match dispatched {
                Ok(result) => result,
                Err(_) => ToolResult::err(EngineError::timeout(format!(
                    "attempt exceeded {}s",
                    attempt_timeout.as_secs()
                ))),
            };

            if tool_result.success {
                last_error = None;
                outcome = Some(tool_result);
                break;
            }

            let error = tool_result
                .error
                .clone()
                .unwrap_or_else(|| EngineError::tool_failure("tool reported failure"));
            tracing::warn!(
                run_id = %self.run_id,
                step_index = step.step_index,
                attempt = attempts,
                error = %error,
                "attempt failed"
            );
            let no_point_retrying =
                matches!(error.kind, ErrorKind::Unsupported | ErrorKind::Fatal);
            last_error = Some(error);
            outcome = Some(tool_result);

            if no_point_retrying || attempts >= self.config.max_retries {
                break;
            }

            // 1s, 2s, 4s, ... between retries.
            let backoff = self.config.backoff_base * 2u32.saturating_pow(attempts - 1);
            let slept = tokio::select! {
                _ = self.stop.wait() => StepFlow::Stopped,
                _ = tokio::time::sleep(backoff) => StepFlow::Continue,
            };
            if let StepFlow::Stopped = slept {
                self.store.update_step_status(
                    step.step_id,
                    StepStatus::Pending,
                    self.clock.epoch_ms(),
                )?;
                return Ok(None);
            }
        }

        let tool = outcome
            .unwrap_or_else(|| ToolResult::err(EngineError::fatal("no attempt was made")));
        let mut result = StepResult::from_tool(
            self.run_id.clone(),
            step.step_id,
            step.step_index,
            attempts.max(1),
            started.elapsed().as_millis() as u64,
            tool,
        );
        result.result_id = self.store.save_step_result(&result)?;

        let status = if result.success {
            StepStatus::Done
        } else {
            StepStatus::Failed
        };
        self.store
            .update_step_status(step.step_id, status, self.clock.epoch_ms())?;

        // Keep the UI hint current.
        let label = step
            .descriptor
            .description
            .clone()
            .unwrap_or_else(|| step.descriptor.tool_name.clone());
        let summary = if result.success {
            label
        } else {
            format!("{label} failed: {}", result.stderr)
        };
        self.store.update_run(
            &self.run_id,
            &RunPatch {
                current_status_summary: Some(summary),
                ..RunPatch::default()
            },
            self.clock.epoch_ms(),
        )?;

        Ok(Some(result))
    }

    /// Ask the cloud for concrete arguments.
    async fn generate_args(
        &self,
        step: &Step,
        descriptor: &StepDescriptor,
        error: Option<&EngineError>,
    ) -> Option<serde_json::Map<String, serde_json::Value>> {
        let previous_steps = self
            .store
            .completed_step_summaries(&self.run_id)
            .unwrap_or_default();
        let request = GenerateArgsRequest {
            step: descriptor.clone(),
            context: self.context.clone(),
            previous_steps,
            error: error.map(|e| e.to_string()),
        };

        match self
            .cloud
            .generate_args(&self.run_id, step.step_id, &request)
            .await
        {
            Ok(response) if response.status == "ok" => response.args,
            Ok(response) => {
                tracing::warn!(
                    run_id = %self.run_id,
                    error = response.error.as_deref().unwrap_or("unknown"),
                    "arg generation rejected"
                );
                None
            }
            Err(e) => {
                tracing::warn!(run_id = %self.run_id, error = %e, "arg generation failed");
                None
            }
        }
    }

    /// Placeholder resolution and server-path translation before dispatch.
    fn prepare_args(
        &self,
        descriptor: &StepDescriptor,
        step: &Step,
    ) -> Result<serde_json::Map<String, serde_json::Value>, RuntimeError> {
        let mut args = descriptor.args.clone().unwrap_or_default();
        let canonical = canonical_name(&descriptor.tool_name);

        if is_file_operation(canonical) {
            args = translate_server_paths(self.dispatcher.sandbox(), &args);
        }

        if canonical == "fs.write" {
            let last_output = self
                .store
                .last_output_before(&self.run_id, step.step_index)?;

            let resolved = args
                .get("content")
                .and_then(|v| v.as_str())
                .map(|content| resolve_placeholders(content, last_output.as_deref()));
            if let Some((content, true)) = resolved {
                args.insert("content".to_string(), serde_json::Value::String(content));
            }

            if let Some(serde_json::Value::Array(files)) = args.get_mut("files") {
                for file in files.iter_mut() {
                    let Some(entry) = file.as_object_mut() else {
                        continue;
                    };
                    let resolved = entry
                        .get("content")
                        .and_then(|v| v.as_str())
                        .map(|content| resolve_placeholders(content, last_output.as_deref()));
                    if let Some((content, true)) = resolved {
                        entry.insert("content".to_string(), serde_json::Value::String(content));
                    }
                }
            }
        }

        Ok(args)
    }

    /// Report a result to the cloud, blocking the loop.
    ///
    /// Returns true when the report had to be queued for the sync worker.
    async fn report_result(&self, step: &Step, result: &StepResult) -> Result<bool, RuntimeError> {
        match self
            .cloud
            .report_result(&self.run_id, step.step_index, result)
            .await
        {
            Ok(ack) => {
                self.store
                    .mark_result_synced(result.result_id, self.clock.epoch_ms())?;
                if ack.status == ReportOutcome::NeedsRecovery {
                    tracing::info!(
                        run_id = %self.run_id,
                        step_index = step.step_index,
                        "cloud requested recovery"
                    );
                }
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(
                    run_id = %self.run_id,
                    step_index = step.step_index,
                    error = %e,
                    "report failed; queuing for sync worker"
                );
                self.store.queue_sync(
                    &self.run_id,
                    SyncAction::ReportResult,
                    &json!({ "step_index": step.step_index }),
                    1,
                    self.clock.epoch_ms(),
                )?;
                Ok(true)
            }
        }
    }

    fn apply_plan_metadata(&self, response: &NextStepResponse) -> Result<(), RuntimeError> {
        let patch = RunPatch {
            total_steps: response.total_steps,
            current_status_summary: response.status_summary.clone(),
            initial_message: response.initial_message.clone(),
            ..RunPatch::default()
        };
        self.store
            .update_run(&self.run_id, &patch, self.clock.epoch_ms())?;
        Ok(())
    }

    async fn sleep_poll(&self) -> StepFlow {
        tokio::select! {
            _ = self.stop.wait() => StepFlow::Stopped,
            _ = tokio::time::sleep(self.config.poll_interval) => StepFlow::Continue,
        }
    }

    fn finish_stopped(&self) -> Result<RunStatus, RuntimeError> {
        self.store.update_run(
            &self.run_id,
            &RunPatch {
                status: Some(RunStatus::Stopped),
                current_status_summary: Some("stopped by user".to_string()),
                ..RunPatch::default()
            },
            self.clock.epoch_ms(),
        )?;
        Ok(RunStatus::Stopped)
    }

    fn finish_failed(&self, summary: &str) -> Result<RunStatus, RuntimeError> {
        self.store.update_run(
            &self.run_id,
            &RunPatch {
                status: Some(RunStatus::Failed),
                current_status_summary: Some(summary.to_string()),
                ..RunPatch::default()
            },
            self.clock.epoch_ms(),
        )?;
        Ok(RunStatus::Failed)
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
