// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat rows: one conversation per (salon, customer phone) pair.
//!
//! Creation goes through a conflict-safe insert-or-ignore-then-select so
//! concurrent first-contact messages cannot create duplicate chats. This is
//! the one place plain read-then-write would be unsafe.

use navalha_core::{Chat, NavalhaError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chat> {
    let status: String = row.get(4)?;
    Ok(Chat {
        id: row.get(0)?,
        salon_id: row.get(1)?,
        customer_phone: row.get(2)?,
        manual_mode: row.get::<_, i64>(3)? != 0,
        status: status.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
        last_activity_at: row.get(5)?,
    })
}

const CHAT_COLUMNS: &str =
    "id, salon_id, customer_phone, manual_mode, status, last_activity_at";

/// Find the chat for (salon, phone), creating it if this is first contact.
pub async fn find_or_create(
    db: &Database,
    salon_id: i64,
    customer_phone: &str,
) -> Result<Chat, NavalhaError> {
    let customer_phone = customer_phone.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO chats (salon_id, customer_phone)
                 VALUES (?1, ?2)
                 ON CONFLICT(salon_id, customer_phone) DO NOTHING",
                params![salon_id, customer_phone],
            )?;
            let chat = tx.query_row(
                &format!(
                    "SELECT {CHAT_COLUMNS} FROM chats
                     WHERE salon_id = ?1 AND customer_phone = ?2"
                ),
                params![salon_id, customer_phone],
                row_to_chat,
            )?;
            tx.commit()?;
            Ok(chat)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a chat by ID.
pub async fn get(db: &Database, chat_id: i64) -> Result<Option<Chat>, NavalhaError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = ?1"),
                params![chat_id],
                row_to_chat,
            );
            match result {
                Ok(chat) => Ok(Some(chat)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Bump a chat's last-activity timestamp.
pub async fn touch(db: &Database, chat_id: i64) -> Result<(), NavalhaError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE chats SET last_activity_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![chat_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Set or clear the manual-mode flag (human takeover).
pub async fn set_manual_mode(
    db: &Database,
    chat_id: i64,
    manual: bool,
) -> Result<(), NavalhaError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE chats SET manual_mode = ?2 WHERE id = ?1",
                params![chat_id, manual as i64],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
