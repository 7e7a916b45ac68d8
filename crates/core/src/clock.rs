// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time source for the engine.
//!
//! Components never read `Instant::now()` or the system time directly;
//! they go through a [`Clock`] so tests can pin wall-clock values and
//! move time forward deterministically.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Provider of monotonic and wall-clock time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant, for measuring elapsed time.
    fn now(&self) -> Instant;

    /// Wall-clock time as milliseconds since the Unix epoch.
    fn epoch_ms(&self) -> u64;
}

/// The real clocks of the host.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Wall-clock value a fresh [`FakeClock`] starts at.
const FAKE_EPOCH_START_MS: u64 = 1_000_000;

struct FakeNow {
    instant: Instant,
    epoch_ms: u64,
}

/// Frozen clock for tests; time moves only through [`FakeClock::advance`].
/// Clones observe the same time.
#[derive(Clone)]
pub struct FakeClock {
    state: Arc<Mutex<FakeNow>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeNow {
                instant: Instant::now(),
                epoch_ms: FAKE_EPOCH_START_MS,
            })),
        }
    }

    /// Move both clocks forward by `step`.
    pub fn advance(&self, step: Duration) {
        let mut state = self.state.lock();
        state.instant += step;
        state.epoch_ms += step.as_millis() as u64;
    }

    /// Pin the wall clock to an exact value.
    pub fn set_epoch_ms(&self, epoch_ms: u64) {
        self.state.lock().epoch_ms = epoch_ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.state.lock().instant
    }

    fn epoch_ms(&self) -> u64 {
        self.state.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
