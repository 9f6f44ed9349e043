// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing setup with PII and secret redaction.
//!
//! Every log line passes through [`RedactingWriter`] before reaching
//! stderr, so customer phone numbers and configured credentials cannot
//! leak whatever a span or event interpolates.

use std::sync::{Arc, RwLock};

use navalha_config::NavalhaConfig;
use navalha_security::{RedactingWriter, add_secret_value};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
pub fn init_tracing(config: &NavalhaConfig) {
    let secrets: Arc<RwLock<Vec<String>>> = Arc::new(RwLock::new(Vec::new()));
    for secret in [
        config.twilio.auth_token.clone(),
        config.twilio.account_sid.clone(),
        config.anthropic.api_key.clone(),
    ]
    .into_iter()
    .flatten()
    {
        add_secret_value(&secrets, secret);
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(move || RedactingWriter::new(std::io::stderr(), Arc::clone(&secrets)))
        .init();
}
