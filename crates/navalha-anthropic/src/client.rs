// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.
//!
//! Provides [`AnthropicClient`] which handles request construction,
//! authentication, and transient error retry. The concierge uses single
//! non-streaming completions; WhatsApp delivery has no use for token
//! streaming.

use std::time::Duration;

use navalha_core::NavalhaError;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse};

/// Base URL for the Anthropic Messages API.
const API_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// HTTP client for Anthropic API communication.
///
/// Manages authentication headers, connection pooling, and retry logic
/// for transient errors (429, 500, 503).
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    default_model: String,
    max_retries: u32,
    base_url: String,
}

impl AnthropicClient {
    /// Creates a new Anthropic API client.
    ///
    /// # Arguments
    /// * `api_key` - Anthropic API key for authentication
    /// * `api_version` - API version string (e.g., "2023-06-01")
    /// * `model` - Default model identifier
    pub fn new(api_key: String, api_version: String, model: String) -> Result<Self, NavalhaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&api_key)
                .map_err(|e| NavalhaError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&api_version).map_err(|e| {
                NavalhaError::Config(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| NavalhaError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            default_model: model,
            max_retries: 1,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Returns the default model identifier.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Sends a completion request and returns the full response.
    ///
    /// On transient errors (429, 500, 503), retries once after a 1-second delay.
    pub async fn send_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, NavalhaError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .json(request)
                .send()
                .await
                .map_err(|e| NavalhaError::Provider {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                return response.json().await.map_err(|e| NavalhaError::Provider {
                    message: format!("malformed completion response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            let body = response.text().await.unwrap_or_default();
            let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(&body) {
                format!(
                    "API returned {status} ({}): {}",
                    api_err.error.error_type, api_err.error.message
                )
            } else {
                format!("API returned {status}")
            };

            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, "transient error, will retry");
                last_error = Some(NavalhaError::Provider {
                    message,
                    source: None,
                });
                continue;
            }

            return Err(NavalhaError::Provider {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| NavalhaError::Provider {
            message: "completion retries exhausted".to_string(),
            source: None,
        }))
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
