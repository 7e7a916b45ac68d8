// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-input bridge.
//!
//! The `user_input` tool forwards a prompt to the UI process and waits
//! for the matching response. The adapter decouples the dispatcher from
//! the IPC surface: the daemon installs a channel-backed adapter and
//! routes `executor:respond-input` messages to it.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tether_core::{EngineError, RequestId};
use tokio::sync::{mpsc, oneshot};

/// A prompt forwarded to the UI, carrying its correlation id.
#[derive(Debug, Clone)]
pub struct InputRequest {
    pub request_id: RequestId,
    pub prompt: String,
}

/// Adapter for forwarding prompts to the user and awaiting answers.
#[async_trait]
pub trait UserInputAdapter: Send + Sync + 'static {
    /// Forward `prompt` under `request_id` and wait for the answer.
    /// Cancellation and timeouts are the caller's concern.
    async fn request(&self, request_id: &RequestId, prompt: &str) -> Result<String, EngineError>;
}

/// Adapter that parks requests until the IPC surface answers them.
#[derive(Clone)]
pub struct ChannelUserInput {
    outgoing: mpsc::Sender<InputRequest>,
    pending: Arc<Mutex<HashMap<RequestId, oneshot::Sender<String>>>>,
}

impl ChannelUserInput {
    /// Returns the adapter and the stream of outgoing prompts the daemon
    /// should surface to the UI.
    pub fn new() -> (Self, mpsc::Receiver<InputRequest>) {
        let (outgoing, rx) = mpsc::channel(16);
        (
            Self {
                outgoing,
                pending: Arc::new(Mutex::new(HashMap::new())),
            },
            rx,
        )
    }

    /// Deliver a UI answer. Returns false when the request is unknown
    /// (already timed out or answered).
    pub fn respond(&self, request_id: &RequestId, response: String) -> bool {
        let sender = self.pending.lock().remove(request_id);
        match sender {
            Some(sender) => sender.send(response).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl UserInputAdapter for ChannelUserInput {
    async fn request(&self, request_id: &RequestId, prompt: &str) -> Result<String, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id.clone(), tx);

        let sent = self
            .outgoing
            .send(InputRequest {
                request_id: request_id.clone(),
                prompt: prompt.to_string(),
            })
            .await;
        if sent.is_err() {
            self.pending.lock().remove(request_id);
            return Err(EngineError::unsupported("no UI attached for user input"));
        }

        match rx.await {
            Ok(answer) => Ok(answer),
            Err(_) => {
                self.pending.lock().remove(request_id);
                Err(EngineError::transient("input channel closed"))
            }
        }
    }
}

/// Adapter for headless deployments: every prompt fails fast.
#[derive(Clone, Default)]
pub struct NoOpUserInput;

#[async_trait]
impl UserInputAdapter for NoOpUserInput {
    async fn request(&self, _request_id: &RequestId, _prompt: &str) -> Result<String, EngineError> {
        Err(EngineError::unsupported("no UI attached for user input"))
    }
}

/// Scripted adapter for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakeUserInput {
    answers: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeUserInput {
    pub fn with_answers(answers: Vec<String>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl UserInputAdapter for FakeUserInput {
    async fn request(&self, _request_id: &RequestId, prompt: &str) -> Result<String, EngineError> {
        self.prompts.lock().push(prompt.to_string());
        let mut answers = self.answers.lock();
        if answers.is_empty() {
            Err(EngineError::unsupported("no scripted answer"))
        } else {
            Ok(answers.remove(0))
        }
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
