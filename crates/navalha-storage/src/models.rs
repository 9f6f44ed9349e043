// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.
//!
//! Domain types shared across crate boundaries live in `navalha-core`; this
//! module re-exports them and adds the queue row shape, which only the
//! storage and worker crates see.

pub use navalha_core::types::{Chat, ChatMessage, ChatRole, ChatStatus, InboundMessage, Salon};

/// One row of the `queue` table.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: i64,
    pub payload: String,
    pub status: String,
    pub attempts: i64,
    pub max_attempts: i64,
    pub next_attempt_at: String,
    pub locked_until: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Outcome of [`crate::queries::queue::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Job returned to pending for another attempt.
    Retried { attempts: i64 },
    /// Retry budget exhausted; job set aside for manual inspection.
    DeadLettered,
}
