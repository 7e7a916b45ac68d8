// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network monitor.
//!
//! Probes the cloud health endpoint on an interval and publishes
//! online/offline transitions over a watch channel. Transitions are
//! debounced: the state flips only after two consecutive probes agree on
//! the new value, so a single dropped packet does not flap the engine.

use crate::client::CloudClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Consecutive agreeing probes required to flip the state.
const DEBOUNCE_PROBES: u32 = 2;

#[derive(Debug, Clone)]
pub struct NetworkMonitorConfig {
    pub probe_interval: Duration,
    /// Assumed state before the first probe completes.
    pub initial_online: bool,
}

impl Default for NetworkMonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(10),
            initial_online: true,
        }
    }
}

/// Periodic health prober with debounced transitions.
pub struct NetworkMonitor {
    tx: watch::Sender<bool>,
    rx: watch::Receiver<bool>,
    config: NetworkMonitorConfig,
}

impl NetworkMonitor {
    pub fn new(config: NetworkMonitorConfig) -> Self {
        let (tx, rx) = watch::channel(config.initial_online);
        Self { tx, rx, config }
    }

    /// The channel consumers watch for transitions.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    /// Current belief about connectivity.
    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    /// Manual override (from the IPC surface). Applied immediately; the
    /// probe loop keeps running and may flip the state back later.
    pub fn set_online(&self, online: bool) {
        self.tx.send_if_modified(|current| {
            if *current != online {
                *current = online;
                true
            } else {
                false
            }
        });
    }

    /// Run the probe loop until the watch channel loses all receivers.
    pub async fn run(self, client: Arc<dyn CloudClient>) {
        let mut interval = tokio::time::interval(self.config.probe_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut disagreements = 0u32;
        loop {
            interval.tick().await;

            let observed = client.health().await;
            let current = *self.rx.borrow();

            if observed == current {
                disagreements = 0;
                continue;
            }

            disagreements += 1;
            if disagreements < DEBOUNCE_PROBES {
                continue;
            }
            disagreements = 0;

            tracing::info!(online = observed, "network status transition");
            if self.tx.send(observed).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
