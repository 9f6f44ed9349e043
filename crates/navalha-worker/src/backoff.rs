// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry backoff schedule for failed jobs.
//!
//! The schedule is owned here, not by the queue: `queue::fail` takes an
//! explicit delay, so the progression stays reproducible and testable
//! instead of depending on whatever a queue library defaults to.

use std::time::Duration;

use navalha_config::model::QueueConfig;
use rand::Rng;

/// Exponential backoff with a cap and uniform jitter.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor per attempt.
    pub multiplier: f64,
    /// Upper bound on the computed delay, before jitter.
    pub max_delay: Duration,
    /// Maximum random jitter added on top.
    pub jitter: Duration,
}

impl BackoffPolicy {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: Duration::from_millis(config.jitter_ms),
        }
    }

    /// Delay before retry number `attempt` (1-based: the first retry is
    /// attempt 1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent as i32);
        let capped = scaled.min(self.max_delay.as_secs_f64());

        let jitter_secs = if self.jitter.is_zero() {
            0.0
        } else {
            rand::thread_rng().gen_range(0.0..self.jitter.as_secs_f64())
        };

        Duration::from_secs_f64(capped + jitter_secs)
    }
}
