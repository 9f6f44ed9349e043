// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./navalha.toml` > `~/.config/navalha/navalha.toml`
//! > `/etc/navalha/navalha.toml` with environment variable overrides via the
//! `NAVALHA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::NavalhaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/navalha/navalha.toml` (system-wide)
/// 3. `~/.config/navalha/navalha.toml` (user XDG config)
/// 4. `./navalha.toml` (local directory)
/// 5. `NAVALHA_*` environment variables
pub fn load_config() -> Result<NavalhaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NavalhaConfig::default()))
        .merge(Toml::file("/etc/navalha/navalha.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("navalha/navalha.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("navalha.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<NavalhaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NavalhaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<NavalhaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NavalhaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `NAVALHA_TWILIO_AUTH_TOKEN` must map to
/// `twilio.auth_token`, not `twilio.auth.token`.
fn env_provider() -> Env {
    Env::prefixed("NAVALHA_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: NAVALHA_TWILIO_AUTH_TOKEN -> "twilio_auth_token"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("webhook_", "webhook.", 1)
            .replacen("twilio_", "twilio.", 1)
            .replacen("anthropic_", "anthropic.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("rate_limit_", "rate_limit.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("worker_", "worker.", 1)
            .replacen("health_", "health.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.service.name, "navalha");
        assert_eq!(config.webhook.port, 8080);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [rate_limit]
            max_messages = 5
            window_secs = 30

            [twilio]
            auth_token = "test-token"
            "#,
        )
        .unwrap();
        assert_eq!(config.rate_limit.max_messages, 5);
        assert_eq!(config.rate_limit.window_secs, 30);
        assert_eq!(config.twilio.auth_token.as_deref(), Some("test-token"));
        // Untouched sections keep defaults.
        assert_eq!(config.queue.max_attempts, 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
            [webhook]
            prot = 9090
            "#,
        );
        assert!(result.is_err());
    }
}
