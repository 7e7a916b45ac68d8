// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket client for the daemon.

use anyhow::{bail, Context, Result};
use tether_daemon::lifecycle::Config;
use tether_daemon::protocol::{self, Request, Response, DEFAULT_TIMEOUT};
use tokio::net::UnixStream;

/// Send one request and await its response.
pub async fn send(request: Request) -> Result<Response> {
    let config = Config::load().context("loading daemon configuration")?;

    let mut stream = match UnixStream::connect(&config.socket_path).await {
        Ok(stream) => stream,
        Err(e) => bail!(
            "cannot reach tetherd at {} ({e}); is the daemon running?",
            config.socket_path.display()
        ),
    };

    let encoded = protocol::encode(&request)?;
    protocol::write_message(&mut stream, &encoded).await?;

    let bytes = tokio::time::timeout(DEFAULT_TIMEOUT, protocol::read_message(&mut stream))
        .await
        .context("daemon did not answer in time")??;
    Ok(protocol::decode(&bytes)?)
}
