// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for outbound message sends.
//!
//! Handles request construction, basic auth, and transient error retry
//! against the provider's Messages endpoint.

use std::time::Duration;

use async_trait::async_trait;
use navalha_core::{NavalhaError, OutboundSender};
use serde::Deserialize;
use tracing::{debug, warn};

/// Base URL for the provider REST API.
const API_BASE_URL: &str = "https://api.twilio.com";

/// Outbound send client.
///
/// Manages authentication, connection pooling, and retry logic for
/// transient errors (429, 5xx).
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    max_retries: u32,
    base_url: String,
}

/// The subset of the provider's message resource we consume.
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<i64>,
}

impl TwilioClient {
    /// Creates a new send client for the given account credentials.
    pub fn new(account_sid: String, auth_token: String) -> Result<Self, NavalhaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| NavalhaError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            account_sid,
            auth_token,
            max_retries: 1,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }

    async fn send_once(
        &self,
        to: &str,
        from: &str,
        body: &str,
    ) -> Result<reqwest::Response, NavalhaError> {
        self.client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", from), ("Body", body)])
            .send()
            .await
            .map_err(|e| NavalhaError::Channel {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 429 || status.is_server_error()
}

#[async_trait]
impl OutboundSender for TwilioClient {
    /// Send one message. Retries once after a 1-second delay on 429/5xx.
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<String, NavalhaError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying outbound send after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self.send_once(to, from, body).await?;
            let status = response.status();
            debug!(status = %status, attempt, "send response received");

            if status.is_success() {
                let resource: MessageResource =
                    response.json().await.map_err(|e| NavalhaError::Channel {
                        message: format!("malformed send response: {e}"),
                        source: Some(Box::new(e)),
                    })?;
                return Ok(resource.sid);
            }

            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorBody>(&text) {
                Ok(err) => format!(
                    "provider returned {status} (code {:?}): {}",
                    err.code,
                    err.message.unwrap_or_default()
                ),
                Err(_) => format!("provider returned {status}"),
            };

            if is_transient_error(status) && attempt < self.max_retries {
                last_error = Some(NavalhaError::Channel {
                    message,
                    source: None,
                });
                continue;
            }

            return Err(NavalhaError::Channel {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| NavalhaError::Channel {
            message: "send retries exhausted".to_string(),
            source: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: String) -> TwilioClient {
        TwilioClient::new("ACtest".into(), "token".into())
            .unwrap()
            .with_base_url(base)
    }

    #[tokio::test]
    async fn send_returns_provider_sid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/ACtest/Messages.json"))
            .and(body_string_contains("Body=Ol%C3%A1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SMaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "status": "queued"
            })))
            .mount(&server)
            .await;

        let sid = client(server.uri())
            .send("whatsapp:+5511987654321", "whatsapp:+5511912345678", "Olá")
            .await
            .unwrap();
        assert_eq!(sid, "SMaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    }

    #[tokio::test]
    async fn transient_error_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "sid": "SMbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"
            })))
            .mount(&server)
            .await;

        let sid = client(server.uri())
            .send("whatsapp:+5511987654321", "whatsapp:+5511912345678", "Oi")
            .await
            .unwrap();
        assert_eq!(sid, "SMbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": 21211,
                "message": "Invalid 'To' phone number"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(server.uri())
            .send("whatsapp:+bad", "whatsapp:+5511912345678", "Oi")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("21211"));
    }
}
