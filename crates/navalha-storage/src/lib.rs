// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Navalha concierge.
//!
//! Holds everything the webhook and worker coordinate through: the salon
//! directory, chats and transcript, raw inbound messages, the at-least-once
//! job queue, idempotency markers, rate counters, and per-chat locks.

pub mod database;
pub mod directory;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod scheduling;

pub use database::{Database, map_tr_err};
pub use directory::SqliteSalonDirectory;
pub use models::{FailOutcome, QueueEntry};
pub use scheduling::SqliteScheduling;
