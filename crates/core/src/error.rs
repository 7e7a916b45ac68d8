// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared across subsystem boundaries.
//!
//! Handlers, dispatcher, executor and sync worker exchange these labels
//! instead of native error types; each subsystem decides retry behavior
//! from the kind alone.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a failure crossing a subsystem boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Network, I/O, brief contention; retried by the owning subsystem
    Transient,
    /// Tool ran to completion but reported failure; triggers adaptive retry
    ToolFailure,
    /// Arguments missing or malformed; retried only after arg regeneration
    ContractViolation,
    /// Path sandbox or OS permission refusal; never retried
    AccessDenied,
    /// Attempt wall-clock exceeded; retried up to the attempt limit
    Timeout,
    /// Platform cannot perform the action; never retried
    Unsupported,
    /// Store corruption or missing configuration; fails the run
    Fatal,
}

impl ErrorKind {
    /// Whether the executor should retry an attempt that failed this way.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Transient | ErrorKind::ToolFailure | ErrorKind::Timeout
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Transient => write!(f, "transient"),
            ErrorKind::ToolFailure => write!(f, "tool-failure"),
            ErrorKind::ContractViolation => write!(f, "contract-violation"),
            ErrorKind::AccessDenied => write!(f, "access-denied"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Unsupported => write!(f, "unsupported"),
            ErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// A labeled failure with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct EngineError {
    #[serde(rename = "code")]
    pub kind: ErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    pub fn tool_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ToolFailure, message)
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContractViolation, message)
    }

    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessDenied, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal, message)
    }

    /// Whether the executor should retry after this error.
    pub fn retryable(&self) -> bool {
        self.kind.retryable()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
