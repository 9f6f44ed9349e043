// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and coherent backoff parameters.

use crate::model::NavalhaConfig;

/// A single configuration problem, reported with its dotted key path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &NavalhaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::new("storage.database_path must not be empty"));
    }

    if config.webhook.host.trim().is_empty() {
        errors.push(ConfigError::new("webhook.host must not be empty"));
    }

    if config.rate_limit.max_messages == 0 {
        errors.push(ConfigError::new(
            "rate_limit.max_messages must be at least 1",
        ));
    }

    if config.rate_limit.window_secs == 0 {
        errors.push(ConfigError::new("rate_limit.window_secs must be at least 1"));
    }

    if config.queue.max_attempts == 0 {
        errors.push(ConfigError::new("queue.max_attempts must be at least 1"));
    }

    if config.queue.multiplier < 1.0 {
        errors.push(ConfigError::new(format!(
            "queue.multiplier must be at least 1.0, got {}",
            config.queue.multiplier
        )));
    }

    if config.queue.max_delay_ms < config.queue.base_delay_ms {
        errors.push(ConfigError::new(format!(
            "queue.max_delay_ms ({}) must not be below queue.base_delay_ms ({})",
            config.queue.max_delay_ms, config.queue.base_delay_ms
        )));
    }

    if config.queue.lock_ttl_secs == 0 {
        errors.push(ConfigError::new("queue.lock_ttl_secs must be at least 1"));
    }

    if config.worker.concurrency == 0 {
        errors.push(ConfigError::new("worker.concurrency must be at least 1"));
    }

    if config.worker.max_tool_rounds == 0 {
        errors.push(ConfigError::new("worker.max_tool_rounds must be at least 1"));
    }

    if config.health.store_unhealthy_ms <= config.health.store_degraded_ms {
        errors.push(ConfigError::new(format!(
            "health.store_unhealthy_ms ({}) must exceed health.store_degraded_ms ({})",
            config.health.store_unhealthy_ms, config.health.store_degraded_ms
        )));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Print collected configuration errors to stderr, one per line.
pub fn render_errors(errors: &[ConfigError]) {
    eprintln!("navalha: invalid configuration:");
    for error in errors {
        eprintln!("  - {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NavalhaConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&NavalhaConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors_without_failing_fast() {
        let mut config = NavalhaConfig::default();
        config.rate_limit.max_messages = 0;
        config.worker.concurrency = 0;
        config.queue.multiplier = 0.5;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn rejects_inverted_health_thresholds() {
        let mut config = NavalhaConfig::default();
        config.health.store_degraded_ms = 2_000;
        config.health.store_unhealthy_ms = 1_000;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].message.contains("store_unhealthy_ms"));
    }
}
