// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment-variable tunables.
//!
//! Every knob is optional; unset or unparseable values fall back to the
//! compiled defaults.

use std::time::Duration;

fn duration_ms(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}

fn u32_var(name: &str) -> Option<u32> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
}

/// `TETHER_POLL_MS` - executor poll interval.
pub fn poll_interval() -> Option<Duration> {
    duration_ms("TETHER_POLL_MS")
}

/// `TETHER_SYNC_MS` - sync worker interval.
pub fn sync_interval() -> Option<Duration> {
    duration_ms("TETHER_SYNC_MS")
}

/// `TETHER_PROBE_MS` - network monitor probe interval.
pub fn probe_interval() -> Option<Duration> {
    duration_ms("TETHER_PROBE_MS")
}

/// `TETHER_ATTEMPT_TIMEOUT_MS` - default per-attempt timeout.
pub fn attempt_timeout() -> Option<Duration> {
    duration_ms("TETHER_ATTEMPT_TIMEOUT_MS")
}

/// `TETHER_MAX_RETRIES` - attempts per step.
pub fn max_retries() -> Option<u32> {
    u32_var("TETHER_MAX_RETRIES")
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
