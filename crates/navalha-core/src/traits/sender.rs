// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound-send trait for the messaging provider collaborator.

use async_trait::async_trait;

use crate::error::NavalhaError;

/// The outbound messaging collaborator.
///
/// `to` and `from` carry the transport's own addressing format
/// (`whatsapp:+E.164`); returns the provider's message identifier.
#[async_trait]
pub trait OutboundSender: Send + Sync + 'static {
    async fn send(&self, to: &str, from: &str, body: &str) -> Result<String, NavalhaError>;
}
