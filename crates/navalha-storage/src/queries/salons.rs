// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Salon directory rows: tenant lookup by WhatsApp number.

use navalha_core::{NavalhaError, Salon};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Register a salon. Returns the row ID.
pub async fn insert(db: &Database, name: &str, whatsapp_number: &str) -> Result<i64, NavalhaError> {
    let name = name.to_string();
    let whatsapp_number = whatsapp_number.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO salons (name, whatsapp_number) VALUES (?1, ?2)",
                params![name, whatsapp_number],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a salon by ID.
pub async fn get(db: &Database, id: i64) -> Result<Option<Salon>, NavalhaError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, name, whatsapp_number FROM salons WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Salon {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        whatsapp_number: row.get(2)?,
                    })
                },
            );
            match result {
                Ok(salon) => Ok(Some(salon)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a salon by its normalized WhatsApp number.
pub async fn find_by_number(
    db: &Database,
    normalized: &str,
) -> Result<Option<Salon>, NavalhaError> {
    let normalized = normalized.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, name, whatsapp_number FROM salons WHERE whatsapp_number = ?1",
                params![normalized],
                |row| {
                    Ok(Salon {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        whatsapp_number: row.get(2)?,
                    })
                },
            );
            match result {
                Ok(salon) => Ok(Some(salon)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn find_by_number_round_trip() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();

        let id = insert(&db, "Barbearia Central", "5511912345678").await.unwrap();
        let salon = find_by_number(&db, "5511912345678").await.unwrap().unwrap();
        assert_eq!(salon.id, id);
        assert_eq!(salon.name, "Barbearia Central");

        assert!(find_by_number(&db, "5511900000000").await.unwrap().is_none());

        db.close().await.unwrap();
    }
}
