// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-job message processing pipeline.
//!
//! Order of gates: rate limit, per-chat lock, manual mode, media-only,
//! then the AI path. The lock keeps replies to one customer in order even
//! with many concurrent consumers; losing the lock race defers the job
//! instead of failing it, so a busy chat never eats a retry budget.
//!
//! Whatever goes wrong mid-conversation, the customer only ever sees a
//! friendly Portuguese fallback. Raw error text stays in the logs.

use std::sync::Arc;

use navalha_config::NavalhaConfig;
use navalha_core::traits::{
    ChatTurn, KnowledgeRetriever, OutboundSender, ReplyBlock, ResponderAdapter,
    ResponderRequest, SchedulingBackend, TurnBlock,
};
use navalha_core::{
    Chat, ChatRole, InboundMessage, JobPayload, MediaKind, NavalhaError, normalize_phone,
};
use navalha_prometheus::record_rate_limited;
use navalha_storage::queries::{chats, lock, messages, ratelimit, salons};
use navalha_storage::{Database, QueueEntry};

use crate::tools::{ToolCall, tool_specs};

/// Reply used when the AI provider is unavailable or returns nothing
/// usable. Must never leak technical detail.
const FALLBACK_REPLY: &str = "Desculpe, estou com uma instabilidade no momento. \
     Pode tentar de novo em alguns minutos? Se for urgente, é só ligar para o salão.";

/// Reply for a tool the backend could not execute.
const TOOL_UNAVAILABLE_RESULT: &str =
    "A consulta não está disponível no momento. Responda ao cliente sem esse dado.";

/// How a job finished, as seen by the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Job is done; ack it.
    Completed,
    /// Chat lock was busy; reschedule without consuming an attempt.
    Deferred,
}

/// Processes one dequeued job end to end.
pub struct MessageProcessor {
    db: Database,
    responder: Arc<dyn ResponderAdapter>,
    sender: Arc<dyn OutboundSender>,
    scheduling: Arc<dyn SchedulingBackend>,
    retriever: Option<Arc<dyn KnowledgeRetriever>>,
    config: Arc<NavalhaConfig>,
}

impl MessageProcessor {
    pub fn new(
        db: Database,
        responder: Arc<dyn ResponderAdapter>,
        sender: Arc<dyn OutboundSender>,
        scheduling: Arc<dyn SchedulingBackend>,
        retriever: Option<Arc<dyn KnowledgeRetriever>>,
        config: Arc<NavalhaConfig>,
    ) -> Self {
        Self {
            db,
            responder,
            sender,
            scheduling,
            retriever,
            config,
        }
    }

    /// Process one queue entry.
    ///
    /// An `Err` means the job should be retried (or dead-lettered) by the
    /// pool; `Deferred` means it lost the chat lock race and goes back to
    /// the queue untouched.
    pub async fn process(&self, entry: &QueueEntry) -> Result<ProcessOutcome, NavalhaError> {
        let payload: JobPayload = serde_json::from_str(&entry.payload)
            .map_err(|e| NavalhaError::Validation(format!("undecodable job payload: {e}")))?;
        let message = &payload.message;
        let sid = message.sid.as_str();
        let customer = normalize_phone(&message.from_phone);

        let resource = format!("chat:{}:{}", payload.salon_id, customer);
        let Some(token) =
            lock::acquire(&self.db, &resource, self.config.queue.lock_ttl_secs).await?
        else {
            tracing::debug!(sid, "chat lock busy, deferring job");
            return Ok(ProcessOutcome::Deferred);
        };

        let result = self.process_locked(entry, &payload, &customer).await;

        // Release on every exit path; on a crash the TTL evicts the lock.
        if let Err(e) = lock::release(&self.db, &resource, &token).await {
            tracing::warn!(sid, error = %e, "failed to release chat lock");
        }

        result
    }

    /// The part of the pipeline that runs with the chat lock held.
    async fn process_locked(
        &self,
        entry: &QueueEntry,
        payload: &JobPayload,
        customer: &str,
    ) -> Result<ProcessOutcome, NavalhaError> {
        let sid = payload.message.sid.as_str();

        // Count each message once, on its first attempt. A job deferred by
        // lock contention or retried after a failure must not burn the
        // customer's window budget again.
        if entry.attempts == 0 {
            let allowed = ratelimit::check_and_increment(
                &self.db,
                customer,
                self.config.rate_limit.max_messages,
                self.config.rate_limit.window_secs,
            )
            .await?;
            if !allowed {
                // The raw inbound stays persisted; only the reply is dropped.
                record_rate_limited();
                tracing::info!(sid, "message dropped by rate limiter");
                return Ok(ProcessOutcome::Completed);
            }
        }

        self.handle_message(payload, customer)
            .await
            .map(|()| ProcessOutcome::Completed)
    }

    async fn handle_message(
        &self,
        payload: &JobPayload,
        customer: &str,
    ) -> Result<(), NavalhaError> {
        let message = &payload.message;
        let sid = message.sid.as_str();

        let chat = chats::find_or_create(&self.db, payload.salon_id, customer).await?;
        messages::append(
            &self.db,
            chat.id,
            ChatRole::User,
            &message.body,
            None,
            Some(sid.to_string()),
        )
        .await?;
        chats::touch(&self.db, chat.id).await?;

        if chat.manual_mode {
            tracing::info!(sid, chat_id = chat.id, "chat in manual mode, no auto reply");
            return Ok(());
        }

        if message.body.trim().is_empty() {
            let Some(first) = message.media.first() else {
                tracing::debug!(sid, "empty message without media, nothing to answer");
                return Ok(());
            };
            let reply = media_fallback(MediaKind::from_content_type(&first.content_type));
            return self.send_reply(chat.id, message, reply, None).await;
        }

        let (reply_text, tool_calls) = self.compose_reply(payload, &chat, customer).await?;
        self.send_reply(chat.id, message, &reply_text, tool_calls)
            .await
    }

    /// Run the AI completion, executing tool calls up to the round budget.
    ///
    /// Responder failures never propagate: the customer gets the fallback
    /// and the job still completes.
    async fn compose_reply(
        &self,
        payload: &JobPayload,
        chat: &Chat,
        customer: &str,
    ) -> Result<(String, Option<String>), NavalhaError> {
        let message = &payload.message;
        let sid = message.sid.as_str();

        let transcript =
            messages::recent_transcript(&self.db, chat.id, self.config.worker.transcript_limit)
                .await?;
        let mut turns: Vec<ChatTurn> = transcript
            .into_iter()
            .filter(|m| !m.content.trim().is_empty())
            .map(|m| ChatTurn::text(m.role, m.content))
            .collect();

        let snippets = match &self.retriever {
            Some(retriever) => match retriever
                .retrieve(payload.salon_id, &message.body, self.config.worker.knowledge_top_k)
                .await
            {
                Ok(snippets) => snippets,
                Err(e) => {
                    tracing::warn!(sid, error = %e, "knowledge retrieval failed, continuing without");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        let salon = salons::get(&self.db, payload.salon_id).await?;
        let salon_name = salon.as_ref().map(|s| s.name.as_str()).unwrap_or("salão");
        let system = build_system_prompt(salon_name, &snippets);

        let tools = tool_specs();
        let mut executed: Vec<serde_json::Value> = Vec::new();

        for round in 0..=self.config.worker.max_tool_rounds {
            let reply = match self
                .responder
                .complete(ResponderRequest {
                    system: Some(system.clone()),
                    turns: turns.clone(),
                    tools: tools.clone(),
                })
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!(sid, error = %e, "responder failed, sending fallback");
                    return Ok((FALLBACK_REPLY.to_string(), None));
                }
            };

            let tool_uses: Vec<(String, String, serde_json::Value)> = reply
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();

            if tool_uses.is_empty() || round == self.config.worker.max_tool_rounds {
                let text = reply.text();
                let text = if text.trim().is_empty() {
                    tracing::warn!(sid, "responder returned no usable text, sending fallback");
                    FALLBACK_REPLY.to_string()
                } else {
                    text
                };
                let tool_calls = (!executed.is_empty())
                    .then(|| serde_json::Value::Array(executed).to_string());
                return Ok((text, tool_calls));
            }

            // Feed the assistant turn back verbatim, then answer each tool
            // use in order.
            turns.push(ChatTurn {
                role: ChatRole::Assistant,
                blocks: reply
                    .blocks
                    .iter()
                    .map(|b| match b {
                        ReplyBlock::Text { text } => TurnBlock::Text { text: text.clone() },
                        ReplyBlock::ToolUse { id, name, input } => TurnBlock::ToolUse {
                            id: id.clone(),
                            name: name.clone(),
                            input: input.clone(),
                        },
                    })
                    .collect(),
            });

            let mut results = Vec::with_capacity(tool_uses.len());
            for (id, name, input) in tool_uses {
                let (content, is_error) = match ToolCall::parse(&name, &input) {
                    Ok(call) => {
                        executed.push(serde_json::json!({ "name": name, "input": input }));
                        match call
                            .execute(self.scheduling.as_ref(), payload.salon_id, customer)
                            .await
                        {
                            Ok(content) => (content, false),
                            Err(e) => {
                                tracing::warn!(sid, tool = name, error = %e, "tool execution failed");
                                (TOOL_UNAVAILABLE_RESULT.to_string(), true)
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(sid, tool = name, error = %e, "rejected tool request");
                        (e.to_string(), true)
                    }
                };
                results.push(TurnBlock::ToolResult {
                    tool_use_id: id,
                    content,
                    is_error,
                });
            }
            turns.push(ChatTurn {
                role: ChatRole::User,
                blocks: results,
            });
        }

        // The loop always returns from its final round.
        Ok((FALLBACK_REPLY.to_string(), None))
    }

    /// Send the reply to the customer and persist the assistant turn.
    async fn send_reply(
        &self,
        chat_id: i64,
        message: &InboundMessage,
        body: &str,
        tool_calls: Option<String>,
    ) -> Result<(), NavalhaError> {
        let provider_sid = self
            .sender
            .send(&message.from_phone, &message.to_phone, body)
            .await?;

        messages::append(
            &self.db,
            chat_id,
            ChatRole::Assistant,
            body,
            tool_calls,
            Some(provider_sid),
        )
        .await?;

        tracing::info!(
            sid = message.sid.as_str(),
            chat_id,
            "reply sent and recorded"
        );
        Ok(())
    }
}

/// Fixed reply when a message carries only media we cannot interpret.
fn media_fallback(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Image => {
            "Recebi sua foto! Por enquanto consigo atender só por texto. \
             Me conta por escrito o que você precisa?"
        }
        MediaKind::Audio => {
            "Recebi seu áudio! Por enquanto consigo atender só por texto. \
             Pode me escrever o que precisa?"
        }
        MediaKind::Video => {
            "Recebi seu vídeo! Por enquanto consigo atender só por texto. \
             Me escreve o que você precisa?"
        }
        MediaKind::Document => {
            "Recebi seu arquivo! Por enquanto consigo atender só por texto. \
             Pode me escrever o que precisa?"
        }
    }
}

fn build_system_prompt(salon_name: &str, snippets: &[String]) -> String {
    let mut prompt = format!(
        "Você é a recepcionista virtual do {salon_name}, atendendo clientes \
         pelo WhatsApp em português brasileiro. Seja simpática, breve e \
         objetiva. Use as ferramentas disponíveis para consultar serviços, \
         verificar horários e agendar; nunca invente preços nem horários."
    );
    if !snippets.is_empty() {
        prompt.push_str("\n\nInformações do salão:");
        for snippet in snippets {
            prompt.push_str("\n- ");
            prompt.push_str(snippet);
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_replies_never_leak_technical_detail() {
        let mut texts = vec![FALLBACK_REPLY.to_string()];
        for kind in [
            MediaKind::Image,
            MediaKind::Audio,
            MediaKind::Video,
            MediaKind::Document,
        ] {
            texts.push(media_fallback(kind).to_string());
        }
        for text in texts {
            assert!(!text.contains("Database"));
            assert!(!text.contains("InternalServerError"));
            assert!(!text.contains("error"));
        }
    }

    #[test]
    fn system_prompt_embeds_snippets() {
        let prompt = build_system_prompt(
            "Barbearia Central",
            &["Aberto de terça a sábado, 9h às 19h".to_string()],
        );
        assert!(prompt.contains("Barbearia Central"));
        assert!(prompt.contains("terça a sábado"));
    }
}
