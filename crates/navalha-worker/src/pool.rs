// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue consumer pool.
//!
//! N consumers poll the shared SQLite queue; a reaper task returns jobs
//! from crashed workers and refreshes the queue depth gauges. Shutdown is
//! cooperative via a `CancellationToken`: consumers finish the job in
//! hand, then stop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use navalha_config::NavalhaConfig;
use navalha_core::NavalhaError;
use navalha_prometheus::{record_dead_letter, record_job, set_queue_depth};
use navalha_storage::queries::queue;
use navalha_storage::{Database, FailOutcome, QueueEntry};

use crate::backoff::BackoffPolicy;
use crate::processor::{MessageProcessor, ProcessOutcome};

/// Interval between reaper sweeps.
const REAPER_INTERVAL: Duration = Duration::from_secs(30);

/// Concurrent queue consumers plus the stale-job reaper.
pub struct WorkerPool {
    db: Database,
    processor: Arc<MessageProcessor>,
    backoff: BackoffPolicy,
    config: Arc<NavalhaConfig>,
}

impl WorkerPool {
    pub fn new(db: Database, processor: Arc<MessageProcessor>, config: Arc<NavalhaConfig>) -> Self {
        let backoff = BackoffPolicy::from_config(&config.queue);
        Self {
            db,
            processor,
            backoff,
            config,
        }
    }

    /// Run until `shutdown` is cancelled, then drain in-flight jobs.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), NavalhaError> {
        let tracker = TaskTracker::new();

        for consumer_id in 0..self.config.worker.concurrency {
            let db = self.db.clone();
            let processor = Arc::clone(&self.processor);
            let backoff = self.backoff.clone();
            let config = Arc::clone(&self.config);
            let shutdown = shutdown.clone();
            tracker.spawn(async move {
                consumer_loop(consumer_id, db, processor, backoff, config, shutdown).await;
            });
        }

        {
            let db = self.db.clone();
            let shutdown = shutdown.clone();
            tracker.spawn(async move {
                reaper_loop(db, shutdown).await;
            });
        }

        tracker.close();
        tracker.wait().await;
        tracing::info!("worker pool stopped");
        Ok(())
    }
}

async fn consumer_loop(
    consumer_id: usize,
    db: Database,
    processor: Arc<MessageProcessor>,
    backoff: BackoffPolicy,
    config: Arc<NavalhaConfig>,
    shutdown: CancellationToken,
) {
    let poll_interval = Duration::from_millis(config.worker.poll_interval_ms);
    tracing::debug!(consumer_id, "consumer started");

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let entry = match queue::dequeue(&db, config.queue.visibility_timeout_secs).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(poll_interval) => continue,
                }
            }
            Err(e) => {
                tracing::error!(consumer_id, error = %e, "dequeue failed");
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = tokio::time::sleep(poll_interval) => continue,
                }
            }
        };

        handle_entry(&db, &processor, &backoff, &config, entry).await;
    }

    tracing::debug!(consumer_id, "consumer stopped");
}

async fn handle_entry(
    db: &Database,
    processor: &MessageProcessor,
    backoff: &BackoffPolicy,
    config: &NavalhaConfig,
    entry: QueueEntry,
) {
    let started = Instant::now();
    let job_id = entry.id;

    match processor.process(&entry).await {
        Ok(ProcessOutcome::Completed) => {
            if let Err(e) = queue::ack(db, job_id).await {
                tracing::error!(job_id, error = %e, "failed to ack completed job");
            }
            record_job("completed", started.elapsed().as_secs_f64());
        }
        Ok(ProcessOutcome::Deferred) => {
            let delay = Duration::from_millis(config.queue.defer_delay_ms);
            if let Err(e) = queue::defer(db, job_id, delay).await {
                tracing::error!(job_id, error = %e, "failed to defer job");
            }
            record_job("deferred", started.elapsed().as_secs_f64());
        }
        Err(e) => {
            // attempts on the row counts prior failures; this one is next.
            let delay = backoff.delay_for(entry.attempts as u32 + 1);
            match queue::fail(db, job_id, delay).await {
                Ok(FailOutcome::Retried { attempts }) => {
                    tracing::warn!(
                        job_id,
                        attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "job failed, scheduled for retry"
                    );
                    record_job("retried", started.elapsed().as_secs_f64());
                }
                Ok(FailOutcome::DeadLettered) => {
                    tracing::error!(
                        job_id,
                        max_attempts = entry.max_attempts,
                        error = %e,
                        "job exhausted retries, dead-lettered"
                    );
                    record_dead_letter();
                    record_job("dead_lettered", started.elapsed().as_secs_f64());
                }
                Err(fail_err) => {
                    // The visibility timeout will resurface the job.
                    tracing::error!(job_id, error = %fail_err, "failed to record job failure");
                }
            }
        }
    }
}

async fn reaper_loop(db: Database, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = tokio::time::sleep(REAPER_INTERVAL) => {}
        }

        match queue::reap_stale(&db).await {
            Ok(0) => {}
            Ok(reaped) => tracing::warn!(reaped, "returned stale jobs to the queue"),
            Err(e) => tracing::error!(error = %e, "stale-job sweep failed"),
        }

        match queue::counts(&db).await {
            Ok(counts) => set_queue_depth(&counts),
            Err(e) => tracing::warn!(error = %e, "queue depth refresh failed"),
        }
    }
}
