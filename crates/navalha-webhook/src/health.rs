// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Health reporter backing GET /webhook/health.
//!
//! Two checks: a timed round trip to the store, and the queue backlog
//! against a configured threshold. The overall status is the worst of the
//! two. The report is safe to expose publicly; it never carries secrets,
//! connection strings, or customer data.

use std::time::Instant;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use navalha_config::model::HealthConfig;
use navalha_core::{HealthStatus, QueueCounts};
use navalha_storage::{Database, map_tr_err, queries::queue};
use serde::Serialize;

/// Latency and backlog thresholds, taken from [`HealthConfig`].
#[derive(Debug, Clone, Copy)]
pub struct HealthThresholds {
    /// Store latency above this is degraded, in milliseconds.
    pub store_degraded_ms: u64,
    /// Store latency above this is unhealthy, in milliseconds.
    pub store_unhealthy_ms: u64,
    /// Waiting-job count above this marks the queue degraded.
    pub backlog_threshold: i64,
}

impl From<&HealthConfig> for HealthThresholds {
    fn from(config: &HealthConfig) -> Self {
        Self {
            store_degraded_ms: config.store_degraded_ms,
            store_unhealthy_ms: config.store_unhealthy_ms,
            backlog_threshold: config.backlog_threshold,
        }
    }
}

/// Result of one store check.
#[derive(Debug, Serialize)]
pub struct StoreCheck {
    /// Check status string.
    pub status: &'static str,
    /// Round-trip latency in milliseconds.
    pub latency_ms: u64,
}

/// Result of one queue check.
#[derive(Debug, Serialize)]
pub struct QueueCheck {
    /// Check status string.
    pub status: &'static str,
    /// Human-readable detail (backlog size, dead-letter count).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Per-subsystem check results.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// Store round-trip check.
    pub store: StoreCheck,
    /// Queue backlog check.
    pub queue: QueueCheck,
}

/// The full health report returned by the endpoint.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// Overall status: worst of the individual checks.
    pub status: &'static str,
    /// ISO 8601 report timestamp.
    pub timestamp: String,
    /// Seconds since the server process started.
    pub uptime_secs: u64,
    /// Individual check results.
    pub checks: HealthChecks,
    /// Queue counts, included only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<QueueCounts>,
}

/// Computes health reports against the shared store.
#[derive(Clone)]
pub struct HealthReporter {
    db: Database,
    thresholds: HealthThresholds,
    started: Instant,
}

impl HealthReporter {
    /// Create a reporter. `started` anchors the uptime figure.
    pub fn new(db: Database, thresholds: HealthThresholds, started: Instant) -> Self {
        Self {
            db,
            thresholds,
            started,
        }
    }

    /// Run all checks and assemble a report.
    pub async fn check(&self, include_metrics: bool) -> HealthReport {
        let (store_status, latency_ms) = self.check_store().await;
        let (queue_status, counts) = self.check_queue().await;

        let overall = store_status.clone().worst(queue_status.clone());

        let queue_details = match &queue_status {
            HealthStatus::Healthy => counts
                .filter(|c| c.dead > 0)
                .map(|c| format!("{} dead-lettered jobs", c.dead)),
            HealthStatus::Degraded(detail) | HealthStatus::Unhealthy(detail) => {
                Some(detail.clone())
            }
        };

        HealthReport {
            status: overall.as_str(),
            timestamp: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
            uptime_secs: self.started.elapsed().as_secs(),
            checks: HealthChecks {
                store: StoreCheck {
                    status: store_status.as_str(),
                    latency_ms,
                },
                queue: QueueCheck {
                    status: queue_status.as_str(),
                    details: queue_details,
                },
            },
            metrics: if include_metrics { counts } else { None },
        }
    }

    /// Run the checks and build the HTTP response: 200 for
    /// healthy/degraded, 503 for unhealthy.
    pub async fn respond(&self, include_metrics: bool) -> Response {
        let report = self.check(include_metrics).await;
        let status = if report.status == "unhealthy" {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::OK
        };
        (status, Json(report)).into_response()
    }

    /// Timed `SELECT 1` against the store.
    async fn check_store(&self) -> (HealthStatus, u64) {
        let started = Instant::now();
        let result = self
            .db
            .connection()
            .call(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err);
        let latency_ms = started.elapsed().as_millis() as u64;

        let status = match result {
            Err(e) => {
                tracing::warn!(error = %e, "store health check failed");
                HealthStatus::Unhealthy("store unreachable".to_string())
            }
            Ok(()) if latency_ms >= self.thresholds.store_unhealthy_ms => {
                HealthStatus::Unhealthy(format!("store latency {latency_ms}ms"))
            }
            Ok(()) if latency_ms >= self.thresholds.store_degraded_ms => {
                HealthStatus::Degraded(format!("store latency {latency_ms}ms"))
            }
            Ok(()) => HealthStatus::Healthy,
        };
        (status, latency_ms)
    }

    /// Queue backlog versus threshold, plus dead-letter visibility.
    async fn check_queue(&self) -> (HealthStatus, Option<QueueCounts>) {
        let counts = match queue::counts(&self.db).await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!(error = %e, "queue health check failed");
                return (
                    HealthStatus::Unhealthy("queue counts unavailable".to_string()),
                    None,
                );
            }
        };

        let status = if counts.waiting > self.thresholds.backlog_threshold {
            HealthStatus::Degraded(format!(
                "backlog of {} waiting jobs exceeds threshold {}",
                counts.waiting, self.thresholds.backlog_threshold
            ))
        } else {
            HealthStatus::Healthy
        };

        (status, Some(counts))
    }
}
