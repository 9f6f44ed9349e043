// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `navalha worker`: the message worker process.
//!
//! Wires the production collaborators (Anthropic responder, Twilio sender,
//! storage-backed scheduling) into the worker pool and runs it until
//! SIGINT.

use std::sync::Arc;

use navalha_anthropic::{AnthropicClient, AnthropicResponder};
use navalha_config::NavalhaConfig;
use navalha_core::NavalhaError;
use navalha_prometheus::PrometheusAdapter;
use navalha_storage::{Database, SqliteScheduling};
use navalha_twilio::TwilioClient;
use navalha_worker::{MessageProcessor, WorkerPool};
use tokio_util::sync::CancellationToken;

pub async fn run(config: NavalhaConfig) -> Result<(), NavalhaError> {
    let account_sid = config
        .twilio
        .account_sid
        .clone()
        .ok_or_else(|| NavalhaError::Config("twilio.account_sid is required".to_string()))?;
    let auth_token = config
        .twilio
        .auth_token
        .clone()
        .ok_or_else(|| NavalhaError::Config("twilio.auth_token is required".to_string()))?;
    let api_key = config
        .anthropic
        .api_key
        .clone()
        .ok_or_else(|| NavalhaError::Config("anthropic.api_key is required".to_string()))?;
    let config = Arc::new(config);

    // The worker has no HTTP surface; the recorder still collects so the
    // counters show up if an exporter is added later.
    let _prometheus = PrometheusAdapter::new()?;

    let db = Database::open(&config.storage.database_path).await?;
    tracing::info!(path = %config.storage.database_path, "store opened");

    let responder = Arc::new(AnthropicResponder::new(
        AnthropicClient::new(
            api_key,
            config.anthropic.api_version.clone(),
            config.anthropic.model.clone(),
        )?,
        config.anthropic.max_tokens,
    ));
    let sender = Arc::new(TwilioClient::new(account_sid, auth_token)?);
    let scheduling = Arc::new(SqliteScheduling::new(db.clone()));

    let processor = Arc::new(MessageProcessor::new(
        db.clone(),
        responder,
        sender,
        scheduling,
        None,
        Arc::clone(&config),
    ));

    let pool = WorkerPool::new(db, processor, Arc::clone(&config));
    let shutdown = CancellationToken::new();

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown requested, draining workers");
            shutdown.cancel();
        });
    }

    tracing::info!(
        concurrency = config.worker.concurrency,
        "worker pool starting"
    );
    pool.run(shutdown).await
}
