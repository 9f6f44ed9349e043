// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock scheduling backend and knowledge retriever.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use navalha_core::NavalhaError;
use navalha_core::traits::{
    BookingConfirmation, BookingRequest, KnowledgeRetriever, SchedulingBackend, ServiceListing,
};

/// In-memory scheduling backend with a fixed catalog.
///
/// Bookings are recorded so tests can assert the worker passed the right
/// arguments through the tool layer.
pub struct MockScheduling {
    services: Vec<ServiceListing>,
    slots: Vec<String>,
    bookings: Arc<Mutex<Vec<BookingRequest>>>,
}

impl MockScheduling {
    pub fn new() -> Self {
        Self {
            services: vec![
                ServiceListing {
                    name: "Corte masculino".to_string(),
                    duration_minutes: 30,
                    price: "R$ 45,00".to_string(),
                },
                ServiceListing {
                    name: "Barba".to_string(),
                    duration_minutes: 20,
                    price: "R$ 30,00".to_string(),
                },
            ],
            slots: vec![
                "09:00".to_string(),
                "10:30".to_string(),
                "14:00".to_string(),
            ],
            bookings: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Bookings accepted so far, in order.
    pub async fn bookings(&self) -> Vec<BookingRequest> {
        self.bookings.lock().await.clone()
    }
}

impl Default for MockScheduling {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchedulingBackend for MockScheduling {
    async fn list_services(&self, _salon_id: i64) -> Result<Vec<ServiceListing>, NavalhaError> {
        Ok(self.services.clone())
    }

    async fn check_availability(
        &self,
        _salon_id: i64,
        _date: &str,
        _service: &str,
    ) -> Result<Vec<String>, NavalhaError> {
        Ok(self.slots.clone())
    }

    async fn book_appointment(
        &self,
        _salon_id: i64,
        request: BookingRequest,
    ) -> Result<BookingConfirmation, NavalhaError> {
        let confirmation = BookingConfirmation {
            appointment_id: format!("apt-{:04}", self.bookings.lock().await.len() + 1),
            date: request.date.clone(),
            time: request.time.clone(),
            service: request.service.clone(),
        };
        self.bookings.lock().await.push(request);
        Ok(confirmation)
    }
}

/// Knowledge retriever that always returns the same snippets.
pub struct StaticRetriever {
    snippets: Vec<String>,
}

impl StaticRetriever {
    pub fn new(snippets: Vec<String>) -> Self {
        Self { snippets }
    }
}

#[async_trait]
impl KnowledgeRetriever for StaticRetriever {
    async fn retrieve(
        &self,
        _salon_id: i64,
        _query: &str,
        k: usize,
    ) -> Result<Vec<String>, NavalhaError> {
        Ok(self.snippets.iter().take(k).cloned().collect())
    }
}
