// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Navalha WhatsApp concierge.
//!
//! This crate provides the shared error type, domain types, and the
//! collaborator traits the webhook endpoint and message worker depend on.
//! Concrete implementations live in the adapter crates.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::NavalhaError;
pub use types::{
    Chat, ChatMessage, ChatRole, ChatStatus, HealthStatus, InboundMessage, JobPayload,
    MediaItem, MediaKind, MessageSid, QueueCounts, Salon, normalize_phone,
};

pub use traits::{
    KnowledgeRetriever, OutboundSender, ResponderAdapter, SalonDirectory, SchedulingBackend,
};
