// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Navalha workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// External message identifier assigned by the transport (`MM`/`SM` + 32 hex chars).
///
/// Used as the idempotency key for inbound deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageSid(pub String);

impl MessageSid {
    /// Parse and validate an external message identifier.
    ///
    /// Accepts the `MM` (media message) and `SM` (text message) prefixes
    /// followed by exactly 32 hex characters.
    pub fn parse(raw: &str) -> Option<Self> {
        let (prefix, rest) = raw.split_at_checked(2)?;
        if !matches!(prefix, "MM" | "SM") {
            return None;
        }
        if rest.len() != 32 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageSid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a transport phone identity to bare digits.
///
/// Strips the `whatsapp:` prefix, the leading `+`, and any formatting
/// characters, so `whatsapp:+55 (11) 98765-4321` and `+5511987654321`
/// key the same rate-limit counter and the same chat.
pub fn normalize_phone(raw: &str) -> String {
    raw.trim_start_matches("whatsapp:")
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect()
}

/// Coarse media category used to pick a safe fallback reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Document,
}

impl MediaKind {
    /// Classify a MIME content type into a media category.
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type.to_ascii_lowercase();
        if ct.starts_with("image/") {
            Self::Image
        } else if ct.starts_with("audio/") {
            Self::Audio
        } else if ct.starts_with("video/") {
            Self::Video
        } else {
            Self::Document
        }
    }
}

/// One media attachment on an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub content_type: String,
    pub url: String,
}

/// Immutable record of a received transport message.
///
/// Created once per distinct [`MessageSid`]; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// External identifier, unique per delivery attempt group.
    pub sid: MessageSid,
    /// Sender address in wire form (`whatsapp:+...`); normalize with
    /// [`normalize_phone`] before using as a key.
    pub from_phone: String,
    /// Recipient (salon) address in wire form (`whatsapp:+...`).
    pub to_phone: String,
    /// Text body; may be empty for media-only messages.
    pub body: String,
    /// Media attachments, in index order.
    pub media: Vec<MediaItem>,
    /// Sender display name, when the transport forwards one.
    pub profile_name: Option<String>,
    /// ISO 8601 receipt timestamp.
    pub received_at: String,
}

/// The payload of a queued job: one inbound message plus routing context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub message: InboundMessage,
    pub salon_id: i64,
}

/// A registered salon and its WhatsApp number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salon {
    pub id: i64,
    pub name: String,
    /// Normalized digits of the salon's WhatsApp number.
    pub whatsapp_number: String,
}

/// A conversation between one customer phone and one salon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub salon_id: i64,
    /// Normalized customer phone digits.
    pub customer_phone: String,
    /// When set, a human has taken over and the AI must not auto-respond.
    pub manual_mode: bool,
    pub status: ChatStatus,
    pub last_activity_at: String,
}

/// Lifecycle state of a chat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Active,
    Closed,
}

/// Author of a transcript entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// An append-only entry in a chat transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: i64,
    pub role: ChatRole,
    pub content: String,
    /// JSON payload of tool calls the assistant made, when any.
    pub tool_calls: Option<String>,
    /// Provider message identifier for sent messages.
    pub external_sid: Option<String>,
    pub created_at: String,
}

/// Tri-state health signal reported by dependency checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Fully operational.
    Healthy,
    /// Operational but experiencing issues.
    Degraded(String),
    /// Not operational.
    Unhealthy(String),
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded(_) => "degraded",
            Self::Unhealthy(_) => "unhealthy",
        }
    }

    /// The worse of two statuses, for aggregating per-check results.
    pub fn worst(self, other: Self) -> Self {
        fn rank(s: &HealthStatus) -> u8 {
            match s {
                HealthStatus::Healthy => 0,
                HealthStatus::Degraded(_) => 1,
                HealthStatus::Unhealthy(_) => 2,
            }
        }
        if rank(&other) > rank(&self) { other } else { self }
    }
}

/// Point-in-time queue depth counters for health reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Pending jobs that are ready to run now.
    pub waiting: i64,
    /// Pending jobs scheduled for a future retry.
    pub delayed: i64,
    /// Jobs currently held by a worker.
    pub active: i64,
    pub completed: i64,
    /// Dead-lettered jobs (retry budget exhausted).
    pub dead: i64,
}
