// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TTL-backed idempotency markers for inbound message identifiers.
//!
//! Presence of an unexpired key means the message was already accepted for
//! enqueueing. False positives after expiry are acceptable; the TTL just
//! has to outlast the transport's retry window.

use navalha_core::NavalhaError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Whether `key` was already accepted (and its marker has not expired).
pub async fn is_processed(db: &Database, key: &str) -> Result<bool, NavalhaError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM idempotency_keys
                     WHERE key = ?1 AND expires_at > strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                    params![key],
                    |_| Ok(()),
                )
                .map(|_| true);
            match found {
                Ok(v) => Ok(v),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(false),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Record `key` as accepted for `ttl_secs`.
///
/// Upserts so a re-mark after expiry refreshes the window. Expired rows are
/// purged opportunistically on each write to bound table growth.
pub async fn mark_processed(db: &Database, key: &str, ttl_secs: u32) -> Result<(), NavalhaError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM idempotency_keys
                 WHERE expires_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
            )?;
            tx.execute(
                "INSERT INTO idempotency_keys (key, expires_at)
                 VALUES (?1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?2))
                 ON CONFLICT(key) DO UPDATE SET expires_at = excluded.expires_at",
                params![key, format!("+{ttl_secs} seconds")],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn unknown_key_is_not_processed() {
        let (db, _dir) = setup_db().await;
        assert!(
            !is_processed(&db, "SM0123456789abcdef0123456789abcdef")
                .await
                .unwrap()
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn marked_key_is_processed() {
        let (db, _dir) = setup_db().await;
        let sid = "SM0123456789abcdef0123456789abcdef";
        mark_processed(&db, sid, 3600).await.unwrap();
        assert!(is_processed(&db, sid).await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_key_is_forgotten() {
        let (db, _dir) = setup_db().await;
        let sid = "SM0123456789abcdef0123456789abcdef";

        // Force an already-expired marker.
        let key = sid.to_string();
        db.connection()
            .call(move |conn| -> rusqlite::Result<()> {
                conn.execute(
                    "INSERT INTO idempotency_keys (key, expires_at)
                     VALUES (?1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-10 seconds'))",
                    params![key],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(!is_processed(&db, sid).await.unwrap());

        // A write purges the expired row.
        mark_processed(&db, "MM0123456789abcdef0123456789abcdef", 3600)
            .await
            .unwrap();
        let count: i64 = db
            .connection()
            .call(|conn| -> rusqlite::Result<i64> {
                let n = conn.query_row("SELECT COUNT(*) FROM idempotency_keys", [], |row| {
                    row.get(0)
                })?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);

        db.close().await.unwrap();
    }
}
