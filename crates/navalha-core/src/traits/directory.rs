// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone-to-salon resolution trait.

use async_trait::async_trait;

use crate::error::NavalhaError;
use crate::types::Salon;

/// Maps a recipient WhatsApp number to a registered salon.
#[async_trait]
pub trait SalonDirectory: Send + Sync + 'static {
    /// Look up a salon by its normalized (digits-only) WhatsApp number.
    ///
    /// `None` means the number is not owned by any tenant; the webhook
    /// still acknowledges such deliveries to stop upstream retries.
    async fn salon_by_number(&self, normalized: &str) -> Result<Option<Salon>, NavalhaError>;
}
