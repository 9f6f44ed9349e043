// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock AI responder for deterministic testing.
//!
//! `MockResponder` implements `ResponderAdapter` with pre-scripted replies,
//! enabling fast, CI-runnable tests without external API calls. Every
//! request it receives is recorded so tests can assert on what the worker
//! actually sent (transcript shape, tool results, system prompt).

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use navalha_core::NavalhaError;
use navalha_core::traits::{
    ReplyBlock, ResponderAdapter, ResponderReply, ResponderRequest,
};

enum Scripted {
    Reply(ResponderReply),
    Error(String),
}

/// A mock responder that replays pre-scripted replies in FIFO order.
///
/// When the script runs out, a default text reply is returned.
pub struct MockResponder {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<ResponderRequest>>>,
}

impl MockResponder {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script a plain-text reply.
    pub async fn push_text(&self, text: impl Into<String>) {
        self.script
            .lock()
            .await
            .push_back(Scripted::Reply(ResponderReply {
                blocks: vec![ReplyBlock::Text { text: text.into() }],
                stop_reason: Some("end_turn".to_string()),
            }));
    }

    /// Script a reply asking for one tool call.
    pub async fn push_tool_use(
        &self,
        id: impl Into<String>,
        name: impl Into<String>,
        input: serde_json::Value,
    ) {
        self.script
            .lock()
            .await
            .push_back(Scripted::Reply(ResponderReply {
                blocks: vec![ReplyBlock::ToolUse {
                    id: id.into(),
                    name: name.into(),
                    input,
                }],
                stop_reason: Some("tool_use".to_string()),
            }));
    }

    /// Script a full custom reply.
    pub async fn push_reply(&self, reply: ResponderReply) {
        self.script.lock().await.push_back(Scripted::Reply(reply));
    }

    /// Script a provider failure.
    pub async fn push_error(&self, message: impl Into<String>) {
        self.script
            .lock()
            .await
            .push_back(Scripted::Error(message.into()));
    }

    /// All requests received so far, in order.
    pub async fn requests(&self) -> Vec<ResponderRequest> {
        self.requests.lock().await.clone()
    }
}

impl Default for MockResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponderAdapter for MockResponder {
    async fn complete(&self, request: ResponderRequest) -> Result<ResponderReply, NavalhaError> {
        self.requests.lock().await.push(request);

        match self.script.lock().await.pop_front() {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Error(message)) => Err(NavalhaError::Provider {
                message,
                source: None,
            }),
            None => Ok(ResponderReply {
                blocks: vec![ReplyBlock::Text {
                    text: "Olá! Como posso ajudar?".to_string(),
                }],
                stop_reason: Some("end_turn".to_string()),
            }),
        }
    }
}
