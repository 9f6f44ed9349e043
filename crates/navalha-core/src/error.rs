// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Navalha concierge core.

use thiserror::Error;

/// The primary error type used across Navalha crates.
#[derive(Debug, Error)]
pub enum NavalhaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A webhook payload that failed schema validation before any side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transport signature did not match the shared-secret HMAC.
    #[error("signature verification failed: {0}")]
    Signature(String),

    /// AI responder errors (API failure, malformed response, token limits).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Outbound messaging channel errors (send failure, provider rejection).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
