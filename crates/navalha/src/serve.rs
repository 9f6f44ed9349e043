// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `navalha serve`: the inbound webhook server process.

use std::sync::Arc;
use std::time::Instant;

use navalha_config::NavalhaConfig;
use navalha_core::NavalhaError;
use navalha_prometheus::PrometheusAdapter;
use navalha_storage::{Database, SqliteSalonDirectory};
use navalha_webhook::{HealthReporter, HealthThresholds, WebhookState, start_server};

pub async fn run(config: NavalhaConfig) -> Result<(), NavalhaError> {
    if !config.webhook.skip_signature_validation && config.twilio.auth_token.is_none() {
        return Err(NavalhaError::Config(
            "twilio.auth_token is required unless webhook.skip_signature_validation is set"
                .to_string(),
        ));
    }
    let config = Arc::new(config);

    let prometheus = Arc::new(PrometheusAdapter::new()?);
    let db = Database::open(&config.storage.database_path).await?;
    tracing::info!(path = %config.storage.database_path, "store opened");

    let health = HealthReporter::new(
        db.clone(),
        HealthThresholds::from(&config.health),
        Instant::now(),
    );
    let state = WebhookState {
        directory: Arc::new(SqliteSalonDirectory::new(db.clone())),
        db,
        config,
        health,
        prometheus_render: Some(Arc::new(move || prometheus.render())),
    };

    start_server(state).await
}
