// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-window rate counters keyed by normalized phone digits.
//!
//! The check and the increment happen in one transaction so concurrent
//! workers cannot both observe count 9 and let an 11th message through.

use navalha_core::NavalhaError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Count one message from `phone` and report whether it is within the cap.
///
/// A window that started more than `window_secs` ago is reset before
/// counting. The caller passes the normalized (digits-only) phone.
pub async fn check_and_increment(
    db: &Database,
    phone: &str,
    max_messages: u32,
    window_secs: u32,
) -> Result<bool, NavalhaError> {
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now: i64 =
                tx.query_row("SELECT CAST(strftime('%s', 'now') AS INTEGER)", [], |row| {
                    row.get(0)
                })?;

            tx.execute(
                "INSERT INTO rate_counters (phone, window_start, count)
                 VALUES (?1, ?2, 1)
                 ON CONFLICT(phone) DO UPDATE SET
                     count = CASE
                         WHEN rate_counters.window_start + ?3 <= ?2 THEN 1
                         ELSE rate_counters.count + 1
                     END,
                     window_start = CASE
                         WHEN rate_counters.window_start + ?3 <= ?2 THEN ?2
                         ELSE rate_counters.window_start
                     END",
                params![phone, now, i64::from(window_secs)],
            )?;

            let count: i64 = tx.query_row(
                "SELECT count FROM rate_counters WHERE phone = ?1",
                params![phone],
                |row| row.get(0),
            )?;
            tx.commit()?;

            Ok(count <= i64::from(max_messages))
        })
        .await
        .map_err(map_tr_err)
}
