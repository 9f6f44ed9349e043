// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed implementation of the salon directory trait.

use async_trait::async_trait;
use navalha_core::{NavalhaError, Salon, SalonDirectory};

use crate::database::Database;
use crate::queries;

/// Resolves recipient numbers against the `salons` table.
#[derive(Clone)]
pub struct SqliteSalonDirectory {
    db: Database,
}

impl SqliteSalonDirectory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SalonDirectory for SqliteSalonDirectory {
    async fn salon_by_number(&self, normalized: &str) -> Result<Option<Salon>, NavalhaError> {
        queries::salons::find_by_number(&self.db, normalized).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn resolves_registered_numbers_only() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        queries::salons::insert(&db, "Studio Lima", "5511912345678")
            .await
            .unwrap();

        let directory = SqliteSalonDirectory::new(db.clone());
        assert!(
            directory
                .salon_by_number("5511912345678")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            directory
                .salon_by_number("5511999999999")
                .await
                .unwrap()
                .is_none()
        );

        db.close().await.unwrap();
    }
}
