// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics adapter for the Navalha concierge.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Metrics are
//! rendered as Prometheus text format via the `render()` method, which is
//! exposed through the webhook server's /metrics endpoint.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use navalha_core::NavalhaError;

pub use recording::{
    record_dead_letter, record_job, record_rate_limited, record_store_latency,
    record_webhook_request, register_metrics, set_queue_depth,
};

/// Prometheus metrics adapter.
///
/// Installs the Prometheus recorder and exposes a handle for rendering
/// metrics in Prometheus text format.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Create a new PrometheusAdapter.
    ///
    /// Installs the Prometheus recorder globally. Only one recorder can be
    /// installed per process. Returns an error if a recorder is already
    /// installed.
    pub fn new() -> Result<Self, NavalhaError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            NavalhaError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Get a reference to the Prometheus handle for rendering.
    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
