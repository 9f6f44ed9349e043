// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge-retrieval trait used to enrich AI context.

use async_trait::async_trait;

use crate::error::NavalhaError;

/// Returns the top-K text snippets relevant to a customer query.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync + 'static {
    async fn retrieve(
        &self,
        salon_id: i64,
        query: &str,
        k: usize,
    ) -> Result<Vec<String>, NavalhaError>;
}
