use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::{MunAssistantError, Result};
use crate::models::{GeminiRequest, GeminiResponse};

#[cfg(test)]
use mockall::automock;

/// Wire access to the remote model. One call, one HTTP request: no retries.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn generate_content(&self, model: &str, req: &GeminiRequest) -> Result<GeminiResponse>;
}

pub struct GeminiTransport {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiTransport {
    pub fn new(cfg: &GeminiConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = cfg.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            MunAssistantError::Config(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            api_key: cfg.api_key.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

fn describe_status(status: StatusCode, body: &str) -> String {
    let reason = match status.as_u16() {
        400 => "Bad request - the model rejected the prompt",
        401 | 403 => "Authentication failed - check your API key",
        404 => "Model not found - check the configured model name",
        429 => "Rate limit exceeded on the generation service",
        500..=599 => "Generation service unavailable",
        _ => "Unexpected response from the generation service",
    };
    format!("{reason} (HTTP {}): {body}", status.as_u16())
}

#[async_trait]
impl Transport for GeminiTransport {
    async fn generate_content(&self, model: &str, req: &GeminiRequest) -> Result<GeminiResponse> {
        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(req)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MunAssistantError::Service(
                        "Request timeout - the generation service took too long to respond".to_string(),
                    )
                } else if e.is_connect() {
                    MunAssistantError::Service(format!(
                        "Connection error - unable to reach the generation service: {e}"
                    ))
                } else {
                    MunAssistantError::Service(format!("Failed to send request to Gemini API: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MunAssistantError::Service(describe_status(status, &body)));
        }

        response.json().await.map_err(|e| {
            MunAssistantError::Service(format!("Failed to parse Gemini API response: {e}"))
        })
    }
}
