// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the cloud planning service.

use crate::types::{GenerateArgsRequest, GenerateArgsResponse, NextStepResponse, ReportAck};
use async_trait::async_trait;
use std::time::Duration;
use tether_core::{RunId, StepResult};
use thiserror::Error;

/// Connect timeout for all cloud calls.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Total timeout for ordinary cloud calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Total timeout for the health probe (kept short so the monitor flips
/// to offline quickly).
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors from cloud calls. All network-level failures are transient;
/// the executor and sync worker retry them.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected response ({status}): {body}")]
    BadResponse { status: u16, body: String },
}

/// Configuration for the cloud connection.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub base_url: String,
    pub token: String,
}

/// The cloud surface the engine depends on.
#[async_trait]
pub trait CloudClient: Send + Sync + 'static {
    /// `GET /api/v2/runs/{run_id}/next-step?last_completed_step={n}`
    async fn next_step(
        &self,
        run_id: &RunId,
        last_completed: i64,
    ) -> Result<NextStepResponse, CloudError>;

    /// `POST /api/v2/runs/{run_id}/steps/{step_index}/result`
    async fn report_result(
        &self,
        run_id: &RunId,
        step_index: i64,
        result: &StepResult,
    ) -> Result<ReportAck, CloudError>;

    /// `POST /api/v2/runs/{run_id}/steps/{step_id}/generate-args`
    async fn generate_args(
        &self,
        run_id: &RunId,
        step_id: i64,
        request: &GenerateArgsRequest,
    ) -> Result<GenerateArgsResponse, CloudError>;

    /// `GET /health`
    async fn health(&self) -> bool;
}

/// Production client over HTTPS with bearer auth.
#[derive(Clone)]
pub struct HttpCloudClient {
    http: reqwest::Client,
    config: CloudConfig,
}

impl HttpCloudClient {
    pub fn new(config: CloudConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CloudError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CloudError::BadResponse {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CloudClient for HttpCloudClient {
    async fn next_step(
        &self,
        run_id: &RunId,
        last_completed: i64,
    ) -> Result<NextStepResponse, CloudError> {
        let url = self.url(&format!(
            "/api/v2/runs/{run_id}/next-step?last_completed_step={last_completed}"
        ));
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn report_result(
        &self,
        run_id: &RunId,
        step_index: i64,
        result: &StepResult,
    ) -> Result<ReportAck, CloudError> {
        let url = self.url(&format!("/api/v2/runs/{run_id}/steps/{step_index}/result"));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(result)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn generate_args(
        &self,
        run_id: &RunId,
        step_id: i64,
        request: &GenerateArgsRequest,
    ) -> Result<GenerateArgsResponse, CloudError> {
        let url = self.url(&format!(
            "/api/v2/runs/{run_id}/steps/{step_id}/generate-args"
        ));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(request)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn health(&self) -> bool {
        let url = self.url("/health");
        match self.http.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
