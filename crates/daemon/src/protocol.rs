// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for the daemon socket.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload.
//! Handlers answer `{success: ...}` envelopes and never let an error
//! cross the socket as anything but a `Response::Error`.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tether_core::Run;
use tether_engine::{EngineStats, RunStatusView};
use thiserror::Error;

/// Request from a UI/CLI client to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    #[serde(rename = "daemon:ping")]
    Ping,

    /// Request daemon shutdown
    #[serde(rename = "daemon:shutdown")]
    Shutdown,

    #[serde(rename = "executor:start-run")]
    StartRun { run_id: String },

    #[serde(rename = "executor:stop-run")]
    StopRun { run_id: String },

    /// Emergency stop of every run
    #[serde(rename = "executor:stop-all")]
    StopAll,

    #[serde(rename = "executor:get-status")]
    GetStatus { run_id: String },

    #[serde(rename = "executor:list-active")]
    ListActive,

    #[serde(rename = "executor:get-stats")]
    GetStats,

    /// Manual online/offline override
    #[serde(rename = "executor:set-online")]
    SetOnline { is_online: bool },

    #[serde(rename = "executor:cleanup")]
    Cleanup {
        #[serde(default = "default_cleanup_days")]
        older_than_days: u32,
    },

    /// Prompts waiting for a user answer
    #[serde(rename = "executor:pending-inputs")]
    PendingInputs,

    /// Answer a parked `user_input` prompt
    #[serde(rename = "executor:respond-input")]
    RespondInput { request_id: String, response: String },
}

fn default_cleanup_days() -> u32 {
    7
}

/// A prompt parked in the daemon, waiting for the UI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingInput {
    pub request_id: String,
    pub prompt: String,
}

/// Response from the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    #[serde(rename = "ok")]
    Ok { success: bool },

    #[serde(rename = "pong")]
    Pong { success: bool },

    #[serde(rename = "shutting-down")]
    ShuttingDown { success: bool },

    #[serde(rename = "run-started")]
    RunStarted { success: bool, run_id: String },

    #[serde(rename = "run-stopped")]
    RunStopped { success: bool, stopped: bool },

    #[serde(rename = "runs-stopped")]
    RunsStopped { success: bool, stopped: usize },

    #[serde(rename = "run-status")]
    RunStatus {
        success: bool,
        status: Option<Box<RunStatusView>>,
    },

    #[serde(rename = "active-runs")]
    ActiveRuns { success: bool, runs: Vec<Run> },

    #[serde(rename = "stats")]
    Stats {
        success: bool,
        stats: Box<EngineStats>,
    },

    #[serde(rename = "online-set")]
    OnlineSet { success: bool, is_online: bool },

    #[serde(rename = "cleaned")]
    Cleaned { success: bool, cleaned: u64 },

    #[serde(rename = "pending-inputs")]
    PendingInputs {
        success: bool,
        inputs: Vec<PendingInput>,
    },

    #[serde(rename = "input-answered")]
    InputAnswered { success: bool, delivered: bool },

    /// Error envelope; `success` is always false
    #[serde(rename = "error")]
    Error { success: bool, message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            success: false,
            message: message.into(),
        }
    }
}

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timeout")]
    Timeout,
}

/// Maximum message size (8 MB; screenshots travel as evidence summaries,
/// not raw frames).
pub const MAX_MESSAGE_SIZE: usize = 8 * 1024 * 1024;

/// Default IPC timeout
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Encode a message to JSON bytes (without length prefix)
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_vec(msg)?;

    if json.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: json.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }

    Ok(json)
}

/// Decode a message from wire format
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Read a length-prefixed message from an async reader
pub async fn read_message<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed);
        }
        Err(e) => return Err(ProtocolError::Io(e)),
    }
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write a length-prefixed message to an async writer
pub async fn write_message<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    let len = data.len();
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: len,
            max: MAX_MESSAGE_SIZE,
        });
    }

    writer.write_all(&(len as u32).to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a request with timeout
pub async fn read_request<R: tokio::io::AsyncReadExt + Unpin>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<Request, ProtocolError> {
    let bytes = tokio::time::timeout(timeout, read_message(reader))
        .await
        .map_err(|_| ProtocolError::Timeout)??;
    decode(&bytes)
}

/// Write a response with timeout
pub async fn write_response<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &Response,
    timeout: std::time::Duration,
) -> Result<(), ProtocolError> {
    let data = encode(response)?;
    tokio::time::timeout(timeout, write_message(writer, &data))
        .await
        .map_err(|_| ProtocolError::Timeout)?
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
