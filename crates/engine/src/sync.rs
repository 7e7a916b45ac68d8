// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background sync worker.
//!
//! Flushes queued cloud calls on an interval and on every transition to
//! online. Items drain in (priority, next_attempt_at) order, at most
//! five per pass; `report_result` items keep per-run FIFO so step N+1 is
//! never reported before step N.

use std::collections::HashSet;
use std::sync::Arc;
use tether_cloud::CloudClient;
use tether_core::{Clock, SyncAction, SyncItem};
use tether_store::StateStore;
use tokio::sync::watch;

/// Items taken per flush pass.
const BATCH_SIZE: usize = 5;

/// Drains the durable sync queue to the cloud.
pub struct SyncWorker<C: CloudClient, K: Clock> {
    store: Arc<StateStore>,
    cloud: Arc<C>,
    clock: K,
    online: watch::Receiver<bool>,
    interval: std::time::Duration,
}

impl<C: CloudClient, K: Clock> SyncWorker<C, K> {
    pub fn new(
        store: Arc<StateStore>,
        cloud: Arc<C>,
        clock: K,
        online: watch::Receiver<bool>,
        interval: std::time::Duration,
    ) -> Self {
        Self {
            store,
            cloud,
            clock,
            online,
            interval,
        }
    }

    /// Run until the online channel closes.
    pub async fn run(mut self) {
        let mut tick = tokio::time::interval(self.interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if *self.online.borrow() {
                        self.flush_once().await;
                    }
                }
                changed = self.online.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    // Drain immediately on an online transition.
                    if *self.online.borrow() {
                        self.flush_once().await;
                    }
                }
            }
        }
    }

    /// One flush pass. Returns the number of items completed.
    pub async fn flush_once(&self) -> usize {
        let now = self.clock.epoch_ms();
        let items = match self.store.get_pending_syncs(BATCH_SIZE, now) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, "sync queue read failed");
                return 0;
            }
        };
        if items.is_empty() {
            return 0;
        }

        let mut completed = 0;
        // Runs whose report failed this pass; later reports for the same
        // run must wait to preserve step order.
        let mut blocked_runs: HashSet<String> = HashSet::new();

        for item in items {
            if item.action == SyncAction::ReportResult
                && blocked_runs.contains(item.run_id.as_str())
            {
                continue;
            }

            match self.dispatch(&item).await {
                Ok(()) => {
                    if let Err(e) = self.store.mark_sync_completed(item.queue_id) {
                        tracing::warn!(queue_id = item.queue_id, error = %e, "mark completed failed");
                    }
                    completed += 1;
                }
                Err(message) => {
                    if item.action == SyncAction::ReportResult {
                        blocked_runs.insert(item.run_id.to_string());
                    }
                    let now = self.clock.epoch_ms();
                    if let Err(e) = self.store.mark_sync_failed(item.queue_id, &message, now) {
                        tracing::warn!(queue_id = item.queue_id, error = %e, "mark failed failed");
                    }
                }
            }
        }

        if completed > 0 {
            tracing::info!(completed, "sync flush pass");
        }
        completed
    }

    async fn dispatch(&self, item: &SyncItem) -> Result<(), String> {
        match item.action {
            SyncAction::ReportResult => {
                // Malformed payloads are completed, not retried forever.
                let Some(step_index) = item.payload["step_index"].as_i64() else {
                    tracing::error!(queue_id = item.queue_id, "report payload missing step_index");
                    return Ok(());
                };

                let result = self
                    .store
                    .get_step_result(&item.run_id, step_index)
                    .map_err(|e| e.to_string())?;
                let Some(result) = result else {
                    // The result row was cleaned up; nothing left to say.
                    return Ok(());
                };
                if result.synced_at_ms.is_some() {
                    return Ok(());
                }

                self.cloud
                    .report_result(&item.run_id, step_index, &result)
                    .await
                    .map_err(|e| e.to_string())?;
                self.store
                    .mark_result_synced(result.result_id, self.clock.epoch_ms())
                    .map_err(|e| e.to_string())?;
                Ok(())
            }
            // Status mirroring rides on result reports; these actions are
            // bookkeeping-only on the engine side.
            SyncAction::UpdateStatus | SyncAction::CompleteRun => {
                tracing::debug!(
                    run_id = %item.run_id,
                    action = %item.action,
                    "local-only sync action completed"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
