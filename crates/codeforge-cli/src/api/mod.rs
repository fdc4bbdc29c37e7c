//! HTTP client for the CodeForge backend
//!
//! Implements the core transport ports over reqwest. Only a connect timeout
//! is set: the execution body streams for as long as the run takes.

use anyhow::{Context, Result};
use async_trait::async_trait;
use codeforge_core::{
    ByteStream, ExecutionBackend, GenerationBackend, TerminalBackend, TransportError,
};
use codeforge_types::{
    ExecuteRequest, GenerateRequest, GenerateResponse, Settings, TerminalRequest,
    TerminalResponse,
};
use futures::StreamExt;
use reqwest::{Client as ReqwestClient, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub struct HttpBackend {
    http: ReqwestClient,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self> {
        let http = ReqwestClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            &settings.server_url,
            Duration::from_secs(settings.connect_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> std::result::Result<Response, TransportError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        Ok(response)
    }
}

/// Human-readable reason from an error body: `detail` or `message` when the
/// body is JSON carrying one, else the raw body, else the status reason
fn error_message(status: StatusCode, body: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    if let Some(text) = value["detail"].as_str().or_else(|| value["message"].as_str()) {
        return text.to_string();
    }

    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        body.to_string()
    }
}

#[async_trait]
impl GenerationBackend for HttpBackend {
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> std::result::Result<GenerateResponse, TransportError> {
        self.post("/api/generate", request)
            .await?
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ExecutionBackend for HttpBackend {
    async fn submit(
        &self,
        request: &ExecuteRequest,
    ) -> std::result::Result<ByteStream, TransportError> {
        let response = self.post("/api/execute", request).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Connection(e.to_string())))
            .boxed())
    }
}

#[async_trait]
impl TerminalBackend for HttpBackend {
    async fn run_command(
        &self,
        request: &TerminalRequest,
    ) -> std::result::Result<TerminalResponse, TransportError> {
        self.post("/api/terminal", request)
            .await?
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}
