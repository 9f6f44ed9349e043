// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests of the message processing pipeline against a temp
//! store and mock collaborators.

use std::sync::Arc;
use std::time::Duration;

use navalha_core::traits::TurnBlock;
use navalha_core::{ChatRole, MediaItem, normalize_phone};
use navalha_storage::QueueEntry;
use navalha_storage::queries::{chats, lock, messages, queue};
use navalha_test_utils::TestHarness;
use navalha_test_utils::harness::CUSTOMER_NUMBER;
use navalha_worker::{MessageProcessor, ProcessOutcome};

fn processor(harness: &TestHarness) -> MessageProcessor {
    MessageProcessor::new(
        harness.db.clone(),
        harness.responder.clone(),
        harness.sender.clone(),
        harness.scheduling.clone(),
        None,
        Arc::clone(&harness.config),
    )
}

async fn dequeue_one(harness: &TestHarness) -> QueueEntry {
    queue::dequeue(&harness.db, harness.config.queue.visibility_timeout_secs)
        .await
        .unwrap()
        .expect("a job should be ready")
}

#[tokio::test]
async fn text_message_round_trip_reaches_responder_and_customer() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .responder
        .push_text("Oferecemos corte, barba e sobrancelha!")
        .await;

    let message = harness.inbound("a1", "Quais serviços vocês oferecem?");
    harness.enqueue(&message).await.unwrap();
    let entry = dequeue_one(&harness).await;

    let outcome = processor(&harness).process(&entry).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Completed);

    // The customer question reached the responder verbatim.
    let requests = harness.responder.requests().await;
    assert_eq!(requests.len(), 1);
    let turn_text: String = requests[0]
        .turns
        .iter()
        .flat_map(|t| t.blocks.iter())
        .filter_map(|b| match b {
            TurnBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert!(turn_text.contains("Quais serviços vocês oferecem?"));

    // A non-empty reply went out and the transcript holds both turns.
    let sent = harness.sender.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, CUSTOMER_NUMBER);
    assert_eq!(sent[0].body, "Oferecemos corte, barba e sobrancelha!");

    let chat = chats::find_or_create(
        &harness.db,
        harness.salon_id,
        &normalize_phone(CUSTOMER_NUMBER),
    )
    .await
    .unwrap();
    let transcript = messages::recent_transcript(&harness.db, chat.id, 10)
        .await
        .unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].role, ChatRole::User);
    assert_eq!(transcript[1].role, ChatRole::Assistant);
    assert!(transcript[1].external_sid.is_some());
}

#[tokio::test]
async fn rate_limited_message_completes_without_reply() {
    let mut config = navalha_config::NavalhaConfig::default();
    config.rate_limit.max_messages = 1;
    let harness = TestHarness::with_config(config).await.unwrap();
    let processor = processor(&harness);

    for suffix in ["b1", "b2"] {
        let message = harness.inbound(suffix, "Oi!");
        harness.enqueue(&message).await.unwrap();
        let entry = dequeue_one(&harness).await;
        let outcome = processor.process(&entry).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::Completed);
        queue::ack(&harness.db, entry.id).await.unwrap();
    }

    // Only the first message got a reply; the second was dropped silently.
    assert_eq!(harness.sender.sent().await.len(), 1);
}

#[tokio::test]
async fn busy_chat_lock_defers_instead_of_failing() {
    let harness = TestHarness::new().await.unwrap();

    let resource = format!(
        "chat:{}:{}",
        harness.salon_id,
        normalize_phone(CUSTOMER_NUMBER)
    );
    let _held = lock::acquire(&harness.db, &resource, 60)
        .await
        .unwrap()
        .expect("test should win the empty lock");

    let message = harness.inbound("c1", "Oi!");
    harness.enqueue(&message).await.unwrap();
    let entry = dequeue_one(&harness).await;

    let outcome = processor(&harness).process(&entry).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Deferred);
    assert!(harness.sender.sent().await.is_empty());
    // Deferral must not consume the retry budget.
    assert_eq!(entry.attempts, 0);
}

#[tokio::test]
async fn deferrals_do_not_consume_the_rate_window() {
    let mut config = navalha_config::NavalhaConfig::default();
    config.rate_limit.max_messages = 2;
    let harness = TestHarness::with_config(config).await.unwrap();
    let processor = processor(&harness);
    harness.responder.push_text("Olá!").await;
    harness.responder.push_text("Claro!").await;

    let resource = format!(
        "chat:{}:{}",
        harness.salon_id,
        normalize_phone(CUSTOMER_NUMBER)
    );
    let held = lock::acquire(&harness.db, &resource, 60)
        .await
        .unwrap()
        .expect("test should win the empty lock");

    let message = harness.inbound("c2", "Oi!");
    harness.enqueue(&message).await.unwrap();
    let entry = dequeue_one(&harness).await;

    // Park the job behind the busy lock well past the window budget.
    for _ in 0..10 {
        let outcome = processor.process(&entry).await.unwrap();
        assert_eq!(outcome, ProcessOutcome::Deferred);
    }
    assert!(lock::release(&harness.db, &resource, &held).await.unwrap());

    // The parked message and the customer's next one both still go through.
    let outcome = processor.process(&entry).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Completed);
    queue::ack(&harness.db, entry.id).await.unwrap();

    let second = harness.inbound("c3", "Tem horário amanhã?");
    harness.enqueue(&second).await.unwrap();
    let entry = dequeue_one(&harness).await;
    let outcome = processor.process(&entry).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Completed);

    assert_eq!(harness.sender.sent().await.len(), 2);
}

#[tokio::test]
async fn manual_mode_persists_inbound_without_reply() {
    let harness = TestHarness::new().await.unwrap();
    let customer = normalize_phone(CUSTOMER_NUMBER);
    let chat = chats::find_or_create(&harness.db, harness.salon_id, &customer)
        .await
        .unwrap();
    chats::set_manual_mode(&harness.db, chat.id, true)
        .await
        .unwrap();

    let message = harness.inbound("d1", "Quero falar com uma pessoa");
    harness.enqueue(&message).await.unwrap();
    let entry = dequeue_one(&harness).await;

    let outcome = processor(&harness).process(&entry).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Completed);

    assert!(harness.sender.sent().await.is_empty());
    assert!(harness.responder.requests().await.is_empty());
    let transcript = messages::recent_transcript(&harness.db, chat.id, 10)
        .await
        .unwrap();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].role, ChatRole::User);
}

#[tokio::test]
async fn media_only_message_gets_fixed_reply_without_ai() {
    let harness = TestHarness::new().await.unwrap();

    let mut message = harness.inbound("e1", "");
    message.media.push(MediaItem {
        content_type: "image/jpeg".to_string(),
        url: "https://api.twilio.com/media/ME1".to_string(),
    });
    harness.enqueue(&message).await.unwrap();
    let entry = dequeue_one(&harness).await;

    let outcome = processor(&harness).process(&entry).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Completed);

    assert!(harness.responder.requests().await.is_empty());
    let sent = harness.sender.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].body.contains("foto"));
}

#[tokio::test]
async fn responder_failure_sends_safe_fallback() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .responder
        .push_error("Database connection refused: InternalServerError")
        .await;

    let message = harness.inbound("f1", "Tem horário amanhã?");
    harness.enqueue(&message).await.unwrap();
    let entry = dequeue_one(&harness).await;

    let outcome = processor(&harness).process(&entry).await.unwrap();
    assert_eq!(outcome, ProcessOutcome::Completed);

    let sent = harness.sender.sent().await;
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].body.is_empty());
    assert!(!sent[0].body.contains("Database"));
    assert!(!sent[0].body.contains("InternalServerError"));
}

#[tokio::test]
async fn tool_round_trip_executes_backend_and_feeds_result() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .responder
        .push_tool_use("tu_1", "list_services", serde_json::json!({}))
        .await;
    harness
        .responder
        .push_text("Oferecemos corte masculino e barba!")
        .await;

    let message = harness.inbound("a2", "O que vocês fazem?");
    harness.enqueue(&message).await.unwrap();
    let entry = dequeue_one(&harness).await;

    processor(&harness).process(&entry).await.unwrap();

    let requests = harness.responder.requests().await;
    assert_eq!(requests.len(), 2);
    let last_turn = requests[1].turns.last().unwrap();
    let result = last_turn
        .blocks
        .iter()
        .find_map(|b| match b {
            TurnBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Some((tool_use_id.as_str(), content.as_str(), *is_error)),
            _ => None,
        })
        .expect("second request should carry a tool result");
    assert_eq!(result.0, "tu_1");
    assert!(result.1.contains("Corte masculino"));
    assert!(!result.2);

    // The executed call is recorded with the assistant turn.
    let chat = chats::find_or_create(
        &harness.db,
        harness.salon_id,
        &normalize_phone(CUSTOMER_NUMBER),
    )
    .await
    .unwrap();
    let transcript = messages::recent_transcript(&harness.db, chat.id, 10)
        .await
        .unwrap();
    let assistant = transcript.last().unwrap();
    assert!(assistant.tool_calls.as_deref().unwrap().contains("list_services"));
}

#[tokio::test]
async fn unknown_tool_becomes_error_result_not_silent_drop() {
    let harness = TestHarness::new().await.unwrap();
    harness
        .responder
        .push_tool_use("tu_9", "cancel_appointment", serde_json::json!({}))
        .await;
    harness.responder.push_text("Entendi!").await;

    let message = harness.inbound("a3", "Cancela meu horário");
    harness.enqueue(&message).await.unwrap();
    let entry = dequeue_one(&harness).await;

    processor(&harness).process(&entry).await.unwrap();

    let requests = harness.responder.requests().await;
    assert_eq!(requests.len(), 2);
    let has_error_result = requests[1].turns.iter().any(|turn| {
        turn.blocks.iter().any(|b| {
            matches!(
                b,
                TurnBlock::ToolResult { is_error: true, content, .. }
                    if content.contains("unknown tool")
            )
        })
    });
    assert!(has_error_result);
}

#[tokio::test]
async fn tool_rounds_are_bounded() {
    let harness = TestHarness::new().await.unwrap();
    // More tool requests than the round budget allows.
    for i in 0..10 {
        harness
            .responder
            .push_tool_use(format!("tu_{i}"), "list_services", serde_json::json!({}))
            .await;
    }

    let message = harness.inbound("a4", "Serviços?");
    harness.enqueue(&message).await.unwrap();
    let entry = dequeue_one(&harness).await;

    processor(&harness).process(&entry).await.unwrap();

    let max_rounds = harness.config.worker.max_tool_rounds as usize;
    assert_eq!(harness.responder.requests().await.len(), max_rounds + 1);
    // The customer still got exactly one message.
    assert_eq!(harness.sender.sent().await.len(), 1);
}

#[tokio::test]
async fn undecodable_payload_fails_for_retry() {
    let harness = TestHarness::new().await.unwrap();
    queue::enqueue(&harness.db, "not json", harness.config.queue.max_attempts)
        .await
        .unwrap();
    let entry = dequeue_one(&harness).await;

    let err = processor(&harness).process(&entry).await.unwrap_err();
    assert!(err.to_string().contains("payload"));
}

#[tokio::test]
async fn failed_send_propagates_so_the_job_retries() {
    let harness = TestHarness::new().await.unwrap();
    harness.sender.set_failing(true);
    harness.responder.push_text("Olá!").await;

    let message = harness.inbound("91", "Oi");
    harness.enqueue(&message).await.unwrap();
    let entry = dequeue_one(&harness).await;

    let result = processor(&harness).process(&entry).await;
    assert!(result.is_err());

    // The lock was released despite the failure, so a retry can proceed.
    let resource = format!(
        "chat:{}:{}",
        harness.salon_id,
        normalize_phone(CUSTOMER_NUMBER)
    );
    let token = lock::acquire(&harness.db, &resource, 60).await.unwrap();
    assert!(token.is_some());
}

#[tokio::test]
async fn worker_pool_drains_the_queue() {
    let harness = TestHarness::new().await.unwrap();
    harness.responder.push_text("Olá!").await;

    let message = harness.inbound("81", "Oi");
    harness.enqueue(&message).await.unwrap();

    let pool = navalha_worker::WorkerPool::new(
        harness.db.clone(),
        Arc::new(processor(&harness)),
        Arc::clone(&harness.config),
    );
    let shutdown = tokio_util::sync::CancellationToken::new();
    let run = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { pool.run(shutdown).await }
    });

    // Wait for the reply, then stop the pool.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if harness.sender.sent().await.len() == 1 {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "pool never processed the job");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    shutdown.cancel();
    run.await.unwrap().unwrap();

    let counts = queue::counts(&harness.db).await.unwrap();
    assert_eq!(counts.active, 0);
    assert_eq!(counts.completed, 1);
}
