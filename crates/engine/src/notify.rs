// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification adapters.
//!
//! The manager announces terminal run states (complete, failed, stopped)
//! through one of these.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Adapter for sending notifications
#[async_trait]
pub trait NotifyAdapter: Send + Sync + 'static {
    /// Send a notification with a title and message body
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError>;
}

/// Desktop notifications via the OS notification center.
///
/// On macOS the first `notify_rust` send runs an AppleScript to discover
/// a bundle identifier; in a daemon without Automation permissions that
/// lookup blocks forever. The constructor pre-sets the bundle id to skip
/// the lookup, and `notify` fires the blocking send without awaiting it
/// so a wedged Notification Center can never stall a run's completion
/// path.
#[derive(Clone, Copy, Default)]
pub struct DesktopNotifyAdapter;

impl DesktopNotifyAdapter {
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        {
            let _ = mac_notification_sys::set_application("com.apple.Terminal");
        }
        Self
    }
}

#[async_trait]
impl NotifyAdapter for DesktopNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let title = title.to_string();
        let message = message.to_string();

        // Fire-and-forget on the blocking pool; outcome is only logged.
        tokio::task::spawn_blocking(move || {
            let shown = notify_rust::Notification::new()
                .summary(&title)
                .body(&message)
                .show();
            match shown {
                Ok(_) => tracing::debug!(%title, "desktop notification sent"),
                Err(e) => tracing::warn!(%title, error = %e, "desktop notification failed"),
            }
        });
        Ok(())
    }
}

/// Silent adapter for headless deployments.
#[derive(Clone, Default)]
pub struct NoOpNotifyAdapter;

#[async_trait]
impl NotifyAdapter for NoOpNotifyAdapter {
    async fn notify(&self, _title: &str, _message: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Recording adapter for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyCall {
    pub title: String,
    pub message: String,
}

#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakeNotifyAdapter {
    calls: std::sync::Arc<parking_lot::Mutex<Vec<NotifyCall>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeNotifyAdapter {
    pub fn calls(&self) -> Vec<NotifyCall> {
        self.calls.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn notify(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        self.calls.lock().push(NotifyCall {
            title: title.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}
