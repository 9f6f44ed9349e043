// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Sets up routes and shared state. The webhook must answer inside Twilio's
//! delivery timeout, so handlers only validate, persist, and enqueue; all
//! slow work happens in the worker process.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use navalha_config::NavalhaConfig;
use navalha_core::NavalhaError;
use navalha_core::traits::SalonDirectory;
use navalha_storage::Database;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::health::HealthReporter;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct WebhookState {
    /// Shared SQLite handle (WAL, also read by the worker process).
    pub db: Database,
    /// Salon lookup by WhatsApp number.
    pub directory: Arc<dyn SalonDirectory>,
    /// Full service configuration.
    pub config: Arc<NavalhaConfig>,
    /// Health reporter for /webhook/health.
    pub health: HealthReporter,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Build the webhook router.
///
/// Separated from [`start_server`] so tests can drive it with
/// `tower::ServiceExt::oneshot` without binding a socket.
pub fn build_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", post(handlers::post_webhook))
        // axum's `get` also answers HEAD with the body stripped.
        .route("/webhook/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the webhook HTTP server.
///
/// Binds to the configured host:port and serves until the process exits.
pub async fn start_server(state: WebhookState) -> Result<(), NavalhaError> {
    let addr = format!(
        "{}:{}",
        state.config.webhook.host, state.config.webhook.port
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| NavalhaError::Channel {
            message: format!("failed to bind webhook server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("webhook server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| NavalhaError::Channel {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
