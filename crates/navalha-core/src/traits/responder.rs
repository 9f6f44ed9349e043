// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Responder trait for the AI completion collaborator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NavalhaError;
use crate::types::ChatRole;

/// A tool the responder may ask the caller to execute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name (unique identifier).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema describing the tool's input parameters.
    pub input_schema: serde_json::Value,
}

/// One turn of conversation handed to the responder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub blocks: Vec<TurnBlock>,
}

impl ChatTurn {
    /// A plain-text turn.
    pub fn text(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            blocks: vec![TurnBlock::Text { text: text.into() }],
        }
    }
}

/// A content block within a conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnBlock {
    /// Plain text.
    Text { text: String },
    /// A tool invocation the assistant requested on a previous turn.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// The caller's result for a prior tool invocation.
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

/// A completion request: system prompt, transcript, and available tools.
#[derive(Debug, Clone)]
pub struct ResponderRequest {
    pub system: Option<String>,
    pub turns: Vec<ChatTurn>,
    pub tools: Vec<ToolSpec>,
}

/// A content block produced by the responder.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBlock {
    Text {
        text: String,
    },
    /// A structured request to execute a named tool and feed the result back.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

/// The responder's reply to one completion request.
#[derive(Debug, Clone)]
pub struct ResponderReply {
    pub blocks: Vec<ReplyBlock>,
    /// Why generation stopped (`end_turn`, `tool_use`, ...), when reported.
    pub stop_reason: Option<String>,
}

impl ResponderReply {
    /// Concatenated text content across all text blocks.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ReplyBlock::Text { text } => Some(text.as_str()),
                ReplyBlock::ToolUse { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// Tool-use blocks in reply order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &serde_json::Value)> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ReplyBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                ReplyBlock::Text { .. } => None,
            })
            .collect()
    }
}

/// The AI completion collaborator.
///
/// Accepts a message list and optional tool schema, returning text or
/// tool-call requests. Implementations own their transport, authentication,
/// and transient-error retry.
#[async_trait]
pub trait ResponderAdapter: Send + Sync + 'static {
    async fn complete(&self, request: ResponderRequest) -> Result<ResponderReply, NavalhaError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_text_joins_text_blocks_only() {
        let reply = ResponderReply {
            blocks: vec![
                ReplyBlock::Text { text: "Olá".into() },
                ReplyBlock::ToolUse {
                    id: "tu_1".into(),
                    name: "list_services".into(),
                    input: serde_json::json!({}),
                },
                ReplyBlock::Text { text: "!".into() },
            ],
            stop_reason: Some("tool_use".into()),
        };
        assert_eq!(reply.text(), "Olá!");
        assert_eq!(reply.tool_uses().len(), 1);
    }
}
