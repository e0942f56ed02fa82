//! Ollama generate API client
//!
//! Implements GraphGenerator against `POST /api/generate` with streaming off,
//! so the backend answers with the whole diagram in one response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerateError, GraphGenerator, SYSTEM_PROMPT};
use crate::config::LlmConfig;

/// Ollama API client
pub struct OllamaClient {
    model: String,
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerateError> {
        debug!(?config, "from_config: called");
        let timeout = config.timeout();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GenerateError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            timeout,
        })
    }

    /// Build the request body for the generate endpoint
    fn build_request_body<'a>(&'a self, subject_title: &'a str) -> GenerateRequest<'a> {
        debug!(%self.model, %subject_title, "build_request_body: called");
        GenerateRequest {
            model: &self.model,
            prompt: subject_title,
            stream: false,
            system: SYSTEM_PROMPT,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> GenerateError {
        if e.is_timeout() {
            GenerateError::Timeout(self.timeout)
        } else {
            GenerateError::Network(e)
        }
    }
}

#[async_trait]
impl GraphGenerator for OllamaClient {
    async fn generate(&self, subject_title: &str) -> Result<String, GenerateError> {
        debug!(%self.model, %subject_title, "generate: called");
        let url = format!("{}/api/generate", self.base_url);
        let body = self.build_request_body(subject_title);

        let response = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, "generate: API error");
            let text = response.text().await.unwrap_or_default();
            return Err(GenerateError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        let api_response: GenerateResponse = serde_json::from_str(&text)?;
        debug!(response_len = api_response.response.len(), "generate: success");
        Ok(api_response.response)
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    system: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}
