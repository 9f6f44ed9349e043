// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seeded test environment for pipeline tests.
//!
//! `TestHarness` opens a temp SQLite store, runs migrations, registers one
//! salon, and hands out the mock collaborators. Tests wire these into the
//! webhook router or a `MessageProcessor` themselves, which keeps this
//! crate free of dependencies on the server and worker crates.

use std::sync::Arc;

use navalha_config::NavalhaConfig;
use navalha_core::{InboundMessage, JobPayload, MessageSid, NavalhaError};
use navalha_storage::queries::{queue, salons};
use navalha_storage::Database;

use crate::mock_responder::MockResponder;
use crate::mock_scheduling::MockScheduling;
use crate::mock_sender::MockSender;

/// The salon WhatsApp number every harness seeds.
pub const SALON_NUMBER: &str = "whatsapp:+5511912345678";
/// A customer number for tests that only need one.
pub const CUSTOMER_NUMBER: &str = "whatsapp:+5511987654321";

/// A complete seeded test environment.
pub struct TestHarness {
    pub db: Database,
    pub salon_id: i64,
    pub config: Arc<NavalhaConfig>,
    pub responder: Arc<MockResponder>,
    pub sender: Arc<MockSender>,
    pub scheduling: Arc<MockScheduling>,
    // Held so the database files outlive the harness.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Build a harness with the default test configuration.
    pub async fn new() -> Result<Self, NavalhaError> {
        Self::with_config(NavalhaConfig::default()).await
    }

    /// Build a harness with a caller-adjusted configuration.
    pub async fn with_config(mut config: NavalhaConfig) -> Result<Self, NavalhaError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| NavalhaError::Storage {
            source: Box::new(e),
        })?;
        let db_path = temp_dir.path().join("navalha-test.db");
        let db_path = db_path.to_string_lossy().to_string();

        config.storage.database_path = db_path.clone();
        config.webhook.skip_signature_validation = true;
        // Tight polling keeps pipeline tests fast.
        config.worker.poll_interval_ms = 20;
        config.queue.defer_delay_ms = 20;

        let db = Database::open(&db_path).await?;
        let salon_id = salons::insert(&db, "Barbearia Navalha", "5511912345678").await?;

        Ok(Self {
            db,
            salon_id,
            config: Arc::new(config),
            responder: Arc::new(MockResponder::new()),
            sender: Arc::new(MockSender::new()),
            scheduling: Arc::new(MockScheduling::new()),
            _temp_dir: temp_dir,
        })
    }

    /// An inbound message from the default customer to the seeded salon.
    ///
    /// `sid_suffix` must be 28 hex digits; it is combined with a fixed
    /// prefix to form a valid message sid.
    pub fn inbound(&self, sid_suffix: &str, body: &str) -> InboundMessage {
        let raw = format!("SM{sid_suffix:0>32}");
        let sid = MessageSid::parse(&raw)
            .unwrap_or_else(|| panic!("harness produced invalid sid {raw}"));
        InboundMessage {
            sid,
            from_phone: CUSTOMER_NUMBER.to_string(),
            to_phone: SALON_NUMBER.to_string(),
            body: body.to_string(),
            media: Vec::new(),
            profile_name: Some("Cliente Teste".to_string()),
            received_at: chrono::Utc::now()
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
        }
    }

    /// Enqueue a job for `message` the way the webhook would.
    pub async fn enqueue(&self, message: &InboundMessage) -> Result<i64, NavalhaError> {
        let payload = JobPayload {
            message: message.clone(),
            salon_id: self.salon_id,
        };
        let payload = serde_json::to_string(&payload)
            .map_err(|e| NavalhaError::Internal(format!("payload encoding: {e}")))?;
        queue::enqueue(&self.db, &payload, self.config.queue.max_attempts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_seeds_one_salon_and_accepts_jobs() {
        let harness = TestHarness::new().await.unwrap();
        let message = harness.inbound("1", "Olá!");
        harness.enqueue(&message).await.unwrap();

        let counts = queue::counts(&harness.db).await.unwrap();
        assert_eq!(counts.waiting, 1);

        let salon = salons::get(&harness.db, harness.salon_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(salon.name, "Barbearia Navalha");
    }
}
