// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API responder for the Navalha concierge.
//!
//! Wraps [`AnthropicClient`] behind the core [`ResponderAdapter`] seam,
//! translating between the workspace's conversation types and the wire
//! format.

pub mod client;
pub mod types;

pub use client::AnthropicClient;

use async_trait::async_trait;
use navalha_core::NavalhaError;
use navalha_core::traits::responder::{
    ChatTurn, ReplyBlock, ResponderAdapter, ResponderReply, ResponderRequest, TurnBlock,
};

use crate::types::{
    ApiContent, ApiContentBlock, ApiMessage, MessageRequest, ResponseContentBlock, ToolDefinition,
};

/// The production AI responder.
pub struct AnthropicResponder {
    client: AnthropicClient,
    max_tokens: u32,
}

impl AnthropicResponder {
    pub fn new(client: AnthropicClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }
}

fn to_api_message(turn: &ChatTurn) -> ApiMessage {
    // Collapse a single text block to the plain-string form the API prefers.
    let content = match turn.blocks.as_slice() {
        [TurnBlock::Text { text }] => ApiContent::Text(text.clone()),
        blocks => ApiContent::Blocks(
            blocks
                .iter()
                .map(|block| match block {
                    TurnBlock::Text { text } => ApiContentBlock::Text { text: text.clone() },
                    TurnBlock::ToolUse { id, name, input } => ApiContentBlock::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    },
                    TurnBlock::ToolResult {
                        tool_use_id,
                        content,
                        is_error,
                    } => ApiContentBlock::ToolResult {
                        tool_use_id: tool_use_id.clone(),
                        content: content.clone(),
                        is_error: is_error.then_some(true),
                    },
                })
                .collect(),
        ),
    };
    ApiMessage {
        role: turn.role.to_string(),
        content,
    }
}

#[async_trait]
impl ResponderAdapter for AnthropicResponder {
    async fn complete(&self, request: ResponderRequest) -> Result<ResponderReply, NavalhaError> {
        let api_request = MessageRequest {
            model: self.client.default_model().to_string(),
            messages: request.turns.iter().map(to_api_message).collect(),
            system: request.system,
            max_tokens: self.max_tokens,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(
                    request
                        .tools
                        .into_iter()
                        .map(|t| ToolDefinition {
                            name: t.name,
                            description: t.description,
                            input_schema: t.input_schema,
                        })
                        .collect(),
                )
            },
        };

        let response = self.client.send_message(&api_request).await?;

        Ok(ResponderReply {
            blocks: response
                .content
                .into_iter()
                .map(|block| match block {
                    ResponseContentBlock::Text { text } => ReplyBlock::Text { text },
                    ResponseContentBlock::ToolUse { id, name, input } => {
                        ReplyBlock::ToolUse { id, name, input }
                    }
                })
                .collect(),
            stop_reason: response.stop_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navalha_core::ChatRole;

    #[test]
    fn single_text_turn_collapses_to_string_content() {
        let turn = ChatTurn::text(ChatRole::User, "Oi");
        let msg = to_api_message(&turn);
        assert_eq!(msg.role, "user");
        assert!(matches!(msg.content, ApiContent::Text(ref t) if t == "Oi"));
    }

    #[test]
    fn tool_result_turn_keeps_block_form() {
        let turn = ChatTurn {
            role: ChatRole::User,
            blocks: vec![TurnBlock::ToolResult {
                tool_use_id: "tu_1".into(),
                content: "[]".into(),
                is_error: false,
            }],
        };
        let msg = to_api_message(&turn);
        match msg.content {
            ApiContent::Blocks(blocks) => {
                assert!(matches!(blocks[0], ApiContentBlock::ToolResult { .. }));
            }
            ApiContent::Text(_) => panic!("tool result must not collapse to text"),
        }
    }
}
