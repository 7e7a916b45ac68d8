// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Tether execution engine.
//!
//! The pull executor drives a run to completion against the cloud
//! planner; the manager owns run lifecycles; the sync worker flushes
//! deferred cloud reports.

mod error;
mod executor;
mod manager;
mod notify;
mod paths;
mod placeholder;
mod sync;

pub use error::RuntimeError;
pub use executor::{EngineConfig, RunExecutor, StopSignal};
pub use manager::{EngineStats, Manager, RunStatusView};
pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter, NotifyError};
pub use paths::translate_server_paths;
pub use placeholder::resolve_placeholders;
pub use sync::SyncWorker;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
