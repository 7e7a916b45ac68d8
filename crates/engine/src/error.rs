// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine runtime

use thiserror::Error;

/// Errors that can occur in the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("storage error: {0}")]
    Store(#[from] tether_store::StoreError),
    #[error("cloud error: {0}")]
    Cloud(#[from] tether_cloud::CloudError),
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("run already active: {0}")]
    RunAlreadyActive(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
