// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics. The webhook intentionally answers 200 for
//! duplicate/unknown-salon/rate-limited deliveries, so the per-outcome
//! counters here are the only place those cases stay distinguishable.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use navalha_core::QueueCounts;

/// Register all Navalha metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "navalha_webhook_requests_total",
        "Webhook deliveries by outcome"
    );
    describe_counter!("navalha_jobs_total", "Worker jobs by outcome");
    describe_counter!(
        "navalha_rate_limited_total",
        "Messages dropped by the per-phone rate limiter"
    );
    describe_counter!(
        "navalha_dead_letters_total",
        "Jobs dead-lettered after exhausting their retry budget"
    );
    describe_gauge!("navalha_queue_depth", "Queue depth by state");
    describe_histogram!(
        "navalha_job_duration_seconds",
        "End-to-end worker job duration in seconds"
    );
    describe_histogram!(
        "navalha_store_latency_seconds",
        "Storage round-trip latency in seconds"
    );
}

/// Record one webhook delivery outcome
/// (accepted, duplicate, unknown_salon, invalid, unauthorized, error).
pub fn record_webhook_request(outcome: &str) {
    metrics::counter!("navalha_webhook_requests_total", "outcome" => outcome.to_string())
        .increment(1);
}

/// Record one processed worker job and its duration.
pub fn record_job(outcome: &str, seconds: f64) {
    metrics::counter!("navalha_jobs_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("navalha_job_duration_seconds").record(seconds);
}

/// Record a message dropped by the rate limiter.
pub fn record_rate_limited() {
    metrics::counter!("navalha_rate_limited_total").increment(1);
}

/// Record a dead-lettered job.
pub fn record_dead_letter() {
    metrics::counter!("navalha_dead_letters_total").increment(1);
}

/// Publish current queue depth gauges.
pub fn set_queue_depth(counts: &QueueCounts) {
    metrics::gauge!("navalha_queue_depth", "state" => "waiting").set(counts.waiting as f64);
    metrics::gauge!("navalha_queue_depth", "state" => "delayed").set(counts.delayed as f64);
    metrics::gauge!("navalha_queue_depth", "state" => "active").set(counts.active as f64);
    metrics::gauge!("navalha_queue_depth", "state" => "dead").set(counts.dead as f64);
}

/// Record a storage round-trip latency.
pub fn record_store_latency(seconds: f64) {
    metrics::histogram!("navalha_store_latency_seconds").record(seconds);
}
