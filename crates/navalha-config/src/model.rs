// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Navalha concierge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Navalha configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NavalhaConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Webhook HTTP server settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Twilio transport settings (signature secret, outbound credentials).
    #[serde(default)]
    pub twilio: TwilioConfig,

    /// Anthropic API settings for the AI responder.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Per-phone rate limiting settings.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Inbound queue retry/backoff and TTL settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Message worker pool settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Health reporter thresholds.
    #[serde(default)]
    pub health: HealthConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "navalha".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Webhook HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally visible URL of the webhook endpoint, as the transport
    /// signs it. Falls back to reconstruction from the Host header.
    #[serde(default)]
    pub public_url: Option<String>,

    /// Skip transport signature validation. Non-production escape hatch only.
    #[serde(default)]
    pub skip_signature_validation: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: None,
            skip_signature_validation: false,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Twilio transport configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TwilioConfig {
    /// Account SID used for outbound sends.
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Auth token: the shared secret for webhook signatures and the
    /// password half of outbound basic auth.
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Anthropic API configuration for the AI responder.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` requires environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model to use for concierge completions.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file shared by webhook and worker.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "navalha.db".to_string()
}

/// Per-phone rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Messages allowed per phone per window.
    #[serde(default = "default_rate_max")]
    pub max_messages: u32,

    /// Fixed window length in seconds.
    #[serde(default = "default_rate_window")]
    pub window_secs: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_messages: default_rate_max(),
            window_secs: default_rate_window(),
        }
    }
}

fn default_rate_max() -> u32 {
    10
}

fn default_rate_window() -> u32 {
    60
}

/// Inbound queue retry/backoff and TTL configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum handler attempts before a job is dead-lettered.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Exponential backoff multiplier between attempts.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound on a single retry delay in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Uniform random jitter added to each delay, in milliseconds.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,

    /// How long a dequeued job stays invisible before it is considered
    /// stale and returned to pending.
    #[serde(default = "default_visibility_secs")]
    pub visibility_timeout_secs: u32,

    /// Idempotency marker lifetime; must outlast the transport retry window.
    #[serde(default = "default_idempotency_ttl")]
    pub idempotency_ttl_secs: u32,

    /// Per-chat lock lifetime.
    #[serde(default = "default_lock_ttl")]
    pub lock_ttl_secs: u32,

    /// Re-queue delay when a job loses the per-chat lock race.
    #[serde(default = "default_defer_delay_ms")]
    pub defer_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
            jitter_ms: default_jitter_ms(),
            visibility_timeout_secs: default_visibility_secs(),
            idempotency_ttl_secs: default_idempotency_ttl(),
            lock_ttl_secs: default_lock_ttl(),
            defer_delay_ms: default_defer_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_jitter_ms() -> u64 {
    250
}

fn default_visibility_secs() -> u32 {
    300
}

fn default_idempotency_ttl() -> u32 {
    21_600 // 6 hours
}

fn default_lock_ttl() -> u32 {
    120
}

fn default_defer_delay_ms() -> u64 {
    1_500
}

/// Message worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Number of concurrent job consumers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Idle polling interval in milliseconds when the queue is empty.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum AI tool-call round-trips per job.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,

    /// Number of recent transcript messages fed to the responder.
    #[serde(default = "default_transcript_limit")]
    pub transcript_limit: u32,

    /// Top-K knowledge snippets retrieved per query.
    #[serde(default = "default_knowledge_top_k")]
    pub knowledge_top_k: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval_ms(),
            max_tool_rounds: default_max_tool_rounds(),
            transcript_limit: default_transcript_limit(),
            knowledge_top_k: default_knowledge_top_k(),
        }
    }
}

fn default_concurrency() -> usize {
    10
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_max_tool_rounds() -> u32 {
    3
}

fn default_transcript_limit() -> u32 {
    20
}

fn default_knowledge_top_k() -> usize {
    3
}

/// Health reporter thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HealthConfig {
    /// Store latency above this is degraded, in milliseconds.
    #[serde(default = "default_store_degraded_ms")]
    pub store_degraded_ms: u64,

    /// Store latency above this is unhealthy, in milliseconds.
    #[serde(default = "default_store_unhealthy_ms")]
    pub store_unhealthy_ms: u64,

    /// Waiting-job count above this marks the queue degraded.
    #[serde(default = "default_backlog_threshold")]
    pub backlog_threshold: i64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            store_degraded_ms: default_store_degraded_ms(),
            store_unhealthy_ms: default_store_unhealthy_ms(),
            backlog_threshold: default_backlog_threshold(),
        }
    }
}

fn default_store_degraded_ms() -> u64 {
    100
}

fn default_store_unhealthy_ms() -> u64 {
    1_000
}

fn default_backlog_threshold() -> i64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = NavalhaConfig::default();
        assert_eq!(config.service.name, "navalha");
        assert_eq!(config.rate_limit.max_messages, 10);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.worker.concurrency, 10);
        assert_eq!(config.queue.max_attempts, 5);
        assert_eq!(config.queue.idempotency_ttl_secs, 21_600);
        assert!(!config.webhook.skip_signature_validation);
    }
}
