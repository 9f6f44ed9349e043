// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! The webhook server and the worker pool run as separate OS processes
//! sharing this database file; WAL mode plus a busy timeout lets both sides
//! write without SQLITE_BUSY under normal load. Within one process all
//! access is serialized through tokio-rusqlite's background thread.

use navalha_core::NavalhaError;
use tokio_rusqlite::Connection;
use tracing::debug;

/// Handle to the shared SQLite database.
///
/// Cheap to clone; all clones share one background connection.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn open(path: &str) -> Result<Self, NavalhaError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| NavalhaError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;",
            )?;
            Ok(crate::migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and release the connection.
    pub async fn close(&self) -> Result<(), NavalhaError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> NavalhaError {
    NavalhaError::Storage {
        source: Box::new(e),
    }
}
