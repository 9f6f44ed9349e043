// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock outbound sender that records sends instead of calling a provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use navalha_core::NavalhaError;
use navalha_core::traits::OutboundSender;

/// One recorded outbound message.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub from: String,
    pub body: String,
}

/// Records outbound sends; can be switched into a failing mode to test
/// provider outages.
pub struct MockSender {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failing: AtomicBool,
}

impl MockSender {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent send fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All messages sent so far, in order.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }
}

impl Default for MockSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutboundSender for MockSender {
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<String, NavalhaError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NavalhaError::Channel {
                message: "simulated provider outage".to_string(),
                source: None,
            });
        }

        self.sent.lock().await.push(SentMessage {
            to: to.to_string(),
            from: from.to_string(),
            body: body.to_string(),
        });
        Ok(format!("SM{}", uuid::Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sends_in_order() {
        let sender = MockSender::new();
        sender
            .send("whatsapp:+5511987654321", "whatsapp:+5511912345678", "Olá")
            .await
            .unwrap();

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "Olá");
    }

    #[tokio::test]
    async fn failing_mode_returns_channel_error() {
        let sender = MockSender::new();
        sender.set_failing(true);
        let err = sender.send("a", "b", "c").await.unwrap_err();
        assert!(matches!(err, NavalhaError::Channel { .. }));
        assert!(sender.sent().await.is_empty());
    }
}
