// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound WhatsApp webhook server for the Navalha concierge.
//!
//! Receives Twilio form posts on `POST /webhook`, validates the request
//! signature and schema, deduplicates deliveries, persists the raw message,
//! and enqueues a processing job. The response is always fast and carries no
//! body; the actual reply is produced later by the worker process.
//!
//! Also serves `GET /webhook/health` and `GET /metrics`.

pub mod handlers;
pub mod health;
pub mod server;

pub use health::{HealthReport, HealthReporter, HealthThresholds};
pub use server::{WebhookState, build_router, start_server};
