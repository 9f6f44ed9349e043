// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduling/service-lookup trait executed on behalf of AI tool calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::NavalhaError;

/// One service a salon offers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceListing {
    pub name: String,
    pub duration_minutes: u32,
    /// Price in the salon's currency, formatted for display.
    pub price: String,
}

/// A booking request assembled from a `book_appointment` tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// ISO date, e.g. `2026-03-14`.
    pub date: String,
    /// Wall-clock start time, e.g. `14:30`.
    pub time: String,
    pub service: String,
    pub customer_name: String,
    /// Normalized customer phone digits.
    pub customer_phone: String,
}

/// Confirmation returned by the scheduling backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    pub appointment_id: String,
    pub date: String,
    pub time: String,
    pub service: String,
}

/// The scheduling/ERP collaborator behind AI tool calls.
///
/// Backed by the calendar/ERP sync layer (Google Calendar, Trinks) in
/// production; tests substitute an in-memory fake.
#[async_trait]
pub trait SchedulingBackend: Send + Sync + 'static {
    async fn list_services(&self, salon_id: i64) -> Result<Vec<ServiceListing>, NavalhaError>;

    /// Free start times for a service on a date.
    async fn check_availability(
        &self,
        salon_id: i64,
        date: &str,
        service: &str,
    ) -> Result<Vec<String>, NavalhaError>;

    async fn book_appointment(
        &self,
        salon_id: i64,
        request: BookingRequest,
    ) -> Result<BookingConfirmation, NavalhaError>;
}
