// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-chat mutual exclusion with TTL and owner-checked release.
//!
//! Acquisition is set-if-not-exists; release is compare-and-delete, so a
//! worker whose lock expired cannot delete a lock a later holder acquired.

use navalha_core::NavalhaError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Try to acquire the lock for `resource` with a TTL.
///
/// Returns the random owner token on success, or `None` when another
/// (unexpired) holder owns the resource. An expired holder is evicted first.
pub async fn acquire(
    db: &Database,
    resource: &str,
    ttl_secs: u32,
) -> Result<Option<String>, NavalhaError> {
    let resource = resource.to_string();
    let token = uuid::Uuid::new_v4().to_string();
    let token_out = token.clone();

    let acquired = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM chat_locks
                 WHERE resource = ?1 AND expires_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![resource],
            )?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO chat_locks (resource, token, expires_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3))",
                params![resource, token, format!("+{ttl_secs} seconds")],
            )?;
            tx.commit()?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)?;

    Ok(acquired.then_some(token_out))
}

/// Release `resource` if (and only if) `token` still owns it.
///
/// The single DELETE is the atomic compare-and-delete. Returns whether a
/// lock was actually released.
pub async fn release(db: &Database, resource: &str, token: &str) -> Result<bool, NavalhaError> {
    let resource = resource.to_string();
    let token = token.to_string();
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM chat_locks WHERE resource = ?1 AND token = ?2",
                params![resource, token],
            )?;
            Ok(deleted == 1)
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
    async fn second_acquire_fails_while_held() {
        let (db, _dir) = setup_db().await;

        let token = acquire(&db, "chat:1", 60).await.unwrap();
        assert!(token.is_some());
        assert!(acquire(&db, "chat:1", 60).await.unwrap().is_none());
        // A different resource is unaffected.
        assert!(acquire(&db, "chat:2", 60).await.unwrap().is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_requires_owner_token() {
        let (db, _dir) = setup_db().await;

        let token = acquire(&db, "chat:1", 60).await.unwrap().unwrap();
        assert!(!release(&db, "chat:1", "not-the-token").await.unwrap());
        // Still held.
        assert!(acquire(&db, "chat:1", 60).await.unwrap().is_none());

        assert!(release(&db, "chat:1", &token).await.unwrap());
        assert!(acquire(&db, "chat:1", 60).await.unwrap().is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_lock_can_be_taken_over() {
        let (db, _dir) = setup_db().await;

        let stale_token = acquire(&db, "chat:1", 60).await.unwrap().unwrap();

        // Age the lock past its TTL.
        db.connection()
            .call(|conn| -> rusqlite::Result<()> {
                conn.execute(
                    "UPDATE chat_locks
                     SET expires_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '-1 seconds')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let new_token = acquire(&db, "chat:1", 60).await.unwrap();
        assert!(new_token.is_some());

        // The stale holder's release must not evict the new holder.
        assert!(!release(&db, "chat:1", &stale_token).await.unwrap());
        assert!(acquire(&db, "chat:1", 60).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_acquires_yield_one_winner() {
        let (db, _dir) = setup_db().await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                acquire(&db, "chat:race", 60).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);

        db.close().await.unwrap();
    }
}
