// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw inbound messages as received at the webhook, keyed by external SID.

use navalha_core::{InboundMessage, MediaItem, MessageSid, NavalhaError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Persist a raw inbound message.
///
/// `INSERT OR IGNORE` keyed on the SID keeps re-deliveries harmless even if
/// the idempotency marker was lost. Returns whether a new row was written.
pub async fn insert(db: &Database, message: &InboundMessage) -> Result<bool, NavalhaError> {
    let media_json = serde_json::to_string(&message.media).map_err(|e| NavalhaError::Storage {
        source: Box::new(e),
    })?;
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO inbound_messages
                 (sid, from_phone, to_phone, body, media, profile_name, received_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    message.sid.as_str(),
                    message.from_phone,
                    message.to_phone,
                    message.body,
                    media_json,
                    message.profile_name,
                    message.received_at,
                ],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a raw inbound message by SID.
pub async fn get(db: &Database, sid: &str) -> Result<Option<InboundMessage>, NavalhaError> {
    let sid = sid.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT sid, from_phone, to_phone, body, media, profile_name, received_at
                 FROM inbound_messages WHERE sid = ?1",
                params![sid],
                |row| {
                    let sid: String = row.get(0)?;
                    let media_json: String = row.get(4)?;
                    let media: Vec<MediaItem> =
                        serde_json::from_str(&media_json).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                4,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?;
                    Ok(InboundMessage {
                        sid: MessageSid(sid),
                        from_phone: row.get(1)?,
                        to_phone: row.get(2)?,
                        body: row.get(3)?,
                        media,
                        profile_name: row.get(5)?,
                        received_at: row.get(6)?,
                    })
                },
            );
            match result {
                Ok(msg) => Ok(Some(msg)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}
