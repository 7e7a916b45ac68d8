// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor manager: the engine's single public entry point.
//!
//! Owns the active-run map, the online flag, and the lifecycles of the
//! per-run executor tasks, the sync worker and process teardown. At most
//! one executor task exists per run id; runs proceed in parallel.

use crate::executor::{EngineConfig, RunExecutor, StopSignal};
use crate::notify::NotifyAdapter;
use crate::sync::SyncWorker;
use crate::RuntimeError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tether_cloud::CloudClient;
use tether_core::{Clock, Run, RunId, RunStatus, SystemContext};
use tether_store::{StateStore, Stats};
use tether_tools::Dispatcher;
use tokio::sync::watch;

struct RunHandle {
    stop: StopSignal,
    task: tokio::task::JoinHandle<()>,
    started: Instant,
}

/// A run's persisted row merged with in-memory execution state.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunStatusView {
    #[serde(flatten)]
    pub run: Run,
    /// True while an executor task for this run is alive in this process
    pub executing: bool,
    /// Elapsed time of the live executor task, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_ms: Option<u64>,
}

/// Engine-wide stats: the store's counters plus live-task info.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EngineStats {
    #[serde(flatten)]
    pub store: Stats,
    pub executing_runs: usize,
    pub online: bool,
}

/// Lifecycle owner for all runs.
pub struct Manager<C: CloudClient, K: Clock> {
    store: Arc<StateStore>,
    cloud: Arc<C>,
    dispatcher: Arc<Dispatcher>,
    clock: K,
    config: EngineConfig,
    context: SystemContext,
    notifier: Arc<dyn NotifyAdapter>,
    runs: Arc<Mutex<HashMap<RunId, RunHandle>>>,
    online: watch::Sender<bool>,
}

impl<C: CloudClient, K: Clock> Manager<C, K> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<StateStore>,
        cloud: Arc<C>,
        dispatcher: Arc<Dispatcher>,
        clock: K,
        config: EngineConfig,
        context: SystemContext,
        notifier: Arc<dyn NotifyAdapter>,
    ) -> Self {
        let (online, _) = watch::channel(true);
        Self {
            store,
            cloud,
            dispatcher,
            clock,
            config,
            context,
            notifier,
            runs: Arc::new(Mutex::new(HashMap::new())),
            online,
        }
    }

    pub fn store(&self) -> Arc<StateStore> {
        Arc::clone(&self.store)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    // ── Online propagation ───────────────────────────────────────────────

    pub fn subscribe_online(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    pub fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::info!(online, "online status propagated");
        }
    }

    /// Spawn the background sync worker wired to the online flag.
    pub fn spawn_sync_worker(&self) -> tokio::task::JoinHandle<()> {
        let worker = SyncWorker::new(
            Arc::clone(&self.store),
            Arc::clone(&self.cloud),
            self.clock.clone(),
            self.subscribe_online(),
            self.config.sync_interval,
        );
        tokio::spawn(worker.run())
    }

    // ── Run lifecycle ────────────────────────────────────────────────────

    /// Start (or resume) a run. Idempotent while the run is executing.
    pub fn start_run(&self, run_id: RunId) -> Result<(), RuntimeError> {
        let mut runs = self.runs.lock();

        if let Some(handle) = runs.get(&run_id) {
            if !handle.task.is_finished() {
                tracing::debug!(%run_id, "run already executing");
                return Ok(());
            }
            runs.remove(&run_id);
        }

        let executor = RunExecutor::new(
            run_id.clone(),
            Arc::clone(&self.store),
            Arc::clone(&self.cloud),
            Arc::clone(&self.dispatcher),
            self.clock.clone(),
            self.config.clone(),
            self.context.clone(),
        );
        let stop = executor.stop_signal();

        let task_runs = Arc::clone(&self.runs);
        let task_store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        let task_run_id = run_id.clone();

        let task = tokio::spawn(async move {
            let status = executor.run().await;

            if status.is_terminal() {
                let summary = task_store
                    .get_run(&task_run_id)
                    .ok()
                    .flatten()
                    .and_then(|run| match status {
                        RunStatus::Complete => run.final_response,
                        _ => run.current_status_summary,
                    })
                    .unwrap_or_default();
                let title = format!("Run {} {}", task_run_id.short(8), status);
                if let Err(e) = notifier.notify(&title, &summary).await {
                    tracing::debug!(error = %e, "notification failed");
                }
            }

            task_runs.lock().remove(&task_run_id);
        });

        runs.insert(
            run_id.clone(),
            RunHandle {
                stop,
                task,
                started: Instant::now(),
            },
        );
        tracing::info!(%run_id, "run started");
        Ok(())
    }

    /// Signal one run to stop and terminate registered processes.
    /// Returns false when the run has no live executor.
    pub fn stop_run(&self, run_id: &RunId) -> bool {
        let stop = self.runs.lock().get(run_id).map(|h| h.stop.clone());
        match stop {
            Some(stop) => {
                stop.stop();
                let processes = self.dispatcher.processes().clone();
                tokio::spawn(async move { processes.terminate_all().await });
                true
            }
            None => false,
        }
    }

    /// Emergency stop: signal every run and every registered process.
    /// Returns promptly; teardown finishes in the background.
    pub fn stop_all_runs(&self) -> usize {
        let stops: Vec<StopSignal> = self.runs.lock().values().map(|h| h.stop.clone()).collect();
        let count = stops.len();
        for stop in &stops {
            stop.stop();
        }

        let processes = self.dispatcher.processes().clone();
        tokio::spawn(async move { processes.terminate_all().await });

        tracing::warn!(runs = count, "emergency stop");
        count
    }

    /// Persisted run state merged with live-task timing.
    pub fn get_run_status(&self, run_id: &RunId) -> Result<Option<RunStatusView>, RuntimeError> {
        let Some(run) = self.store.get_run(run_id)? else {
            return Ok(None);
        };
        let (executing, uptime_ms) = {
            let runs = self.runs.lock();
            match runs.get(run_id) {
                Some(handle) if !handle.task.is_finished() => {
                    (true, Some(handle.started.elapsed().as_millis() as u64))
                }
                _ => (false, None),
            }
        };
        Ok(Some(RunStatusView {
            run,
            executing,
            uptime_ms,
        }))
    }

    pub fn list_active_runs(&self) -> Result<Vec<Run>, RuntimeError> {
        Ok(self.store.list_active_runs()?)
    }

    /// Called at process start: demote orphaned running steps, then
    /// reopen every active run.
    pub fn resume_active_runs(&self) -> Result<usize, RuntimeError> {
        self.store.demote_running_steps()?;
        let active = self.store.list_active_runs()?;
        for run in &active {
            self.start_run(run.run_id.clone())?;
        }
        if !active.is_empty() {
            tracing::info!(count = active.len(), "resumed active runs");
        }
        Ok(active.len())
    }

    pub fn get_stats(&self) -> Result<EngineStats, RuntimeError> {
        let store = self.store.stats()?;
        let executing_runs = {
            let runs = self.runs.lock();
            runs.values().filter(|h| !h.task.is_finished()).count()
        };
        Ok(EngineStats {
            store,
            executing_runs,
            online: self.is_online(),
        })
    }

    pub fn cleanup(&self, older_than_days: u32) -> Result<u64, RuntimeError> {
        Ok(self
            .store
            .cleanup(older_than_days, self.clock.epoch_ms())?)
    }

    /// Graceful engine shutdown: stop runs, then tear down tool
    /// resources (processes, browser).
    pub async fn shutdown(&self) {
        self.stop_all_runs();
        self.dispatcher.shutdown().await;
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
