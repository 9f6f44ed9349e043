// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only chat transcript entries.

use navalha_core::{ChatMessage, ChatRole, NavalhaError};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    let role: String = row.get(2)?;
    Ok(ChatMessage {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        role: role.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        content: row.get(3)?,
        tool_calls: row.get(4)?,
        external_sid: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Append one transcript entry. Returns the row ID.
pub async fn append(
    db: &Database,
    chat_id: i64,
    role: ChatRole,
    content: &str,
    tool_calls: Option<String>,
    external_sid: Option<String>,
) -> Result<i64, NavalhaError> {
    let content = content.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (chat_id, role, content, tool_calls, external_sid)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![chat_id, role.to_string(), content, tool_calls, external_sid],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent `limit` transcript entries, oldest first.
pub async fn recent_transcript(
    db: &Database,
    chat_id: i64,
    limit: u32,
) -> Result<Vec<ChatMessage>, NavalhaError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, chat_id, role, content, tool_calls, external_sid, created_at
                 FROM messages
                 WHERE chat_id = ?1
                 ORDER BY id DESC
                 LIMIT ?2",
            )?;
            let mut rows: Vec<ChatMessage> = stmt
                .query_map(params![chat_id, limit], row_to_message)?
                .collect::<Result<_, _>>()?;
            rows.reverse();
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{chats, salons};
    use tempfile::tempdir;

    async fn setup_chat() -> (Database, i64, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let salon_id = salons::insert(&db, "Studio Lima", "5511912345678")
            .await
            .unwrap();
        let chat = chats::find_or_create(&db, salon_id, "5511987654321")
            .await
            .unwrap();
        (db, chat.id, dir)
    }

    #[tokio::test]
    async fn transcript_preserves_append_order() {
        let (db, chat_id, _dir) = setup_chat().await;

        append(&db, chat_id, ChatRole::User, "Oi", None, None)
            .await
            .unwrap();
        append(&db, chat_id, ChatRole::Assistant, "Olá! Como posso ajudar?", None, None)
            .await
            .unwrap();
        append(&db, chat_id, ChatRole::User, "Quais serviços vocês oferecem?", None, None)
            .await
            .unwrap();

        let transcript = recent_transcript(&db, chat_id, 20).await.unwrap();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0].content, "Oi");
        assert_eq!(transcript[0].role, ChatRole::User);
        assert_eq!(transcript[1].role, ChatRole::Assistant);
        assert_eq!(transcript[2].content, "Quais serviços vocês oferecem?");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn transcript_limit_keeps_newest() {
        let (db, chat_id, _dir) = setup_chat().await;

        for i in 0..5 {
            append(&db, chat_id, ChatRole::User, &format!("m{i}"), None, None)
                .await
                .unwrap();
        }

        let transcript = recent_transcript(&db, chat_id, 2).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].content, "m3");
        assert_eq!(transcript[1].content, "m4");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn tool_calls_payload_round_trips() {
        let (db, chat_id, _dir) = setup_chat().await;

        let payload = r#"[{"name":"list_services","input":{}}]"#.to_string();
        append(
            &db,
            chat_id,
            ChatRole::Assistant,
            "Temos corte e barba.",
            Some(payload.clone()),
            Some("SMaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".into()),
        )
        .await
        .unwrap();

        let transcript = recent_transcript(&db, chat_id, 5).await.unwrap();
        assert_eq!(transcript[0].tool_calls.as_deref(), Some(payload.as_str()));
        assert!(transcript[0].external_sid.is_some());

        db.close().await.unwrap();
    }
}
