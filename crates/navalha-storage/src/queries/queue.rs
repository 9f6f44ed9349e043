// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! At-least-once job queue shared by the webhook (producer) and the worker
//! pool (consumers).
//!
//! Retry scheduling lives in `next_attempt_at`; the backoff schedule itself
//! is computed by the caller, so queue semantics do not depend on any queue
//! library's defaults. Jobs that exhaust their attempt budget move to the
//! `dead` status for manual inspection.

use std::time::Duration;

use navalha_core::{NavalhaError, QueueCounts};
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::{FailOutcome, QueueEntry};

fn modifier(delay: Duration) -> String {
    format!("+{:.3} seconds", delay.as_secs_f64())
}

/// Enqueue a new job. Returns the auto-generated queue entry ID.
pub async fn enqueue(
    db: &Database,
    payload: &str,
    max_attempts: u32,
) -> Result<i64, NavalhaError> {
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queue (payload, max_attempts) VALUES (?1, ?2)",
                params![payload, max_attempts],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Dequeue the next ready pending entry.
///
/// Atomically selects the oldest pending entry whose `next_attempt_at` has
/// passed and marks it `processing` with a visibility timeout. Returns
/// `None` if nothing is ready.
pub async fn dequeue(
    db: &Database,
    visibility_timeout_secs: u32,
) -> Result<Option<QueueEntry>, NavalhaError> {
    db.connection()
        .call(move |conn| {
            // Transaction makes the find + claim atomic across consumers.
            let tx = conn.transaction()?;

            let result = {
                let mut stmt = tx.prepare(
                    "SELECT id, payload, status, attempts, max_attempts,
                            next_attempt_at, locked_until, created_at, updated_at
                     FROM queue
                     WHERE status = 'pending'
                       AND next_attempt_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     ORDER BY id ASC
                     LIMIT 1",
                )?;
                stmt.query_row([], |row| {
                    Ok(QueueEntry {
                        id: row.get(0)?,
                        payload: row.get(1)?,
                        status: row.get(2)?,
                        attempts: row.get(3)?,
                        max_attempts: row.get(4)?,
                        next_attempt_at: row.get(5)?,
                        locked_until: row.get(6)?,
                        created_at: row.get(7)?,
                        updated_at: row.get(8)?,
                    })
                })
            };

            match result {
                Ok(entry) => {
                    tx.execute(
                        "UPDATE queue SET status = 'processing',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![entry.id, format!("+{visibility_timeout_secs} seconds")],
                    )?;
                    tx.commit()?;

                    Ok(Some(QueueEntry {
                        status: "processing".to_string(),
                        ..entry
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Acknowledge successful processing: mark the entry `completed`.
pub async fn ack(db: &Database, id: i64) -> Result<(), NavalhaError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'completed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a handler failure.
///
/// Increments attempts. At the attempt budget the job is dead-lettered;
/// otherwise it returns to `pending` with `retry_delay` applied to
/// `next_attempt_at`.
pub async fn fail(
    db: &Database,
    id: i64,
    retry_delay: Duration,
) -> Result<FailOutcome, NavalhaError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let (attempts, max_attempts): (i64, i64) = tx.query_row(
                "SELECT attempts, max_attempts FROM queue WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            let outcome = if new_attempts >= max_attempts {
                tx.execute(
                    "UPDATE queue SET status = 'dead', attempts = ?1,
                     locked_until = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![new_attempts, id],
                )?;
                FailOutcome::DeadLettered
            } else {
                tx.execute(
                    "UPDATE queue SET status = 'pending', attempts = ?1,
                     locked_until = NULL,
                     next_attempt_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![new_attempts, id, modifier(retry_delay)],
                )?;
                FailOutcome::Retried {
                    attempts: new_attempts,
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Return a job to `pending` after `delay` without consuming an attempt.
///
/// Used when the job lost the per-chat lock race: it must run later, in
/// order, and a busy chat must not eat its retry budget.
pub async fn defer(db: &Database, id: i64, delay: Duration) -> Result<(), NavalhaError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queue SET status = 'pending', locked_until = NULL,
                 next_attempt_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, modifier(delay)],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Return `processing` entries whose visibility timeout lapsed to `pending`.
///
/// Covers worker crashes mid-job; the at-least-once contract means such
/// jobs may be processed again.
pub async fn reap_stale(db: &Database) -> Result<usize, NavalhaError> {
    db.connection()
        .call(|conn| {
            let reaped = conn.execute(
                "UPDATE queue SET status = 'pending', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'processing'
                   AND locked_until IS NOT NULL
                   AND locked_until <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
            )?;
            Ok(reaped)
        })
        .await
        .map_err(map_tr_err)
}

/// Point-in-time depth counters for health reporting.
pub async fn counts(db: &Database) -> Result<QueueCounts, NavalhaError> {
    db.connection()
        .call(|conn| {
            let now = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";
            let row = conn.query_row(
                &format!(
                    "SELECT
                        COUNT(*) FILTER (WHERE status = 'pending' AND next_attempt_at <= {now}),
                        COUNT(*) FILTER (WHERE status = 'pending' AND next_attempt_at > {now}),
                        COUNT(*) FILTER (WHERE status = 'processing'),
                        COUNT(*) FILTER (WHERE status = 'completed'),
                        COUNT(*) FILTER (WHERE status = 'dead')
                     FROM queue"
                ),
                [],
                |row| {
                    Ok(QueueCounts {
                        waiting: row.get(0)?,
                        delayed: row.get(1)?,
                        active: row.get(2)?,
                        completed: row.get(3)?,
                        dead: row.get(4)?,
                    })
                },
            )?;
            Ok(row)
        })
        .await
        .map_err(map_tr_err)
}
