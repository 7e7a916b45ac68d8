// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `web.fetch` handler.

use crate::args::{opt_str, opt_u64, require_str, ArgMap};
use serde_json::json;
use std::time::Duration;
use tether_core::{EngineError, ToolResult};

/// Connect timeout for all fetches.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default total timeout, overridable per call via `timeout_sec`.
const TOTAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Cap on the response body returned in stdout.
const BODY_CAP: usize = 256 * 1024;

/// HTTP GET/POST with timeouts. Body goes to stdout (capped); status and
/// headers of interest go to evidence.
pub async fn fetch(client: &reqwest::Client, args: &ArgMap) -> ToolResult {
    let url = match require_str(args, "url") {
        Ok(u) => u,
        Err(e) => return ToolResult::err(e),
    };
    let method = opt_str(args, "method").unwrap_or("GET").to_uppercase();
    let timeout = opt_u64(args, "timeout_sec")
        .map(Duration::from_secs)
        .unwrap_or(TOTAL_TIMEOUT);

    let request = match method.as_str() {
        "GET" => client.get(url),
        "POST" => {
            let request = client.post(url);
            match args.get("body") {
                Some(serde_json::Value::String(text)) => request.body(text.clone()),
                Some(value) => request.json(value),
                None => request,
            }
        }
        other => {
            return ToolResult::err(EngineError::contract(format!(
                "unsupported method: {other}"
            )))
        }
    };

    let response = request.timeout(timeout).send().await;

    match response {
        Ok(response) => {
            let status = response.status();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let body = response.text().await.unwrap_or_default();
            let truncated = body.len() > BODY_CAP;
            let body = if truncated {
                body[..BODY_CAP].to_string()
            } else {
                body
            };

            let evidence = json!({
                "status": status.as_u16(),
                "content_type": content_type,
                "truncated": truncated,
            });

            if status.is_success() {
                ToolResult::ok(body).with_evidence(evidence)
            } else {
                let mut result = ToolResult::err(EngineError::tool_failure(format!(
                    "HTTP {} from {url}",
                    status.as_u16()
                )));
                result.stdout = body;
                result.with_evidence(evidence)
            }
        }
        Err(e) if e.is_timeout() => ToolResult::err(EngineError::timeout(format!(
            "fetch timed out after {}s",
            timeout.as_secs()
        ))),
        Err(e) => ToolResult::err(EngineError::transient(format!("fetch failed: {e}"))),
    }
}

/// Build the shared HTTP client for the dispatcher.
pub fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_default()
}
