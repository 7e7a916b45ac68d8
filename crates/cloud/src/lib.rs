// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Cloud protocol client and network monitor.

mod client;
mod monitor;
mod types;

pub use client::{CloudClient, CloudConfig, CloudError, HttpCloudClient};
pub use monitor::{NetworkMonitor, NetworkMonitorConfig};
pub use types::{
    GenerateArgsRequest, GenerateArgsResponse, NextStepResponse, NextStepStatus, ReportAck,
    ReportOutcome,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{CloudCall, FakeCloudClient};
