//! Backfill processor
//!
//! Reads the interaction history of local users and fills embeddings in
//! batches through the engine's cache, persisting each computed vector.

use fedirank_common::db::DbPool;
use fedirank_common::embeddings::Embedder;
use fedirank_common::errors::Result;
use fedirank_common::models::Status;
use fedirank_engine::EmbeddingCache;
use sqlx::Row;
use std::sync::Arc;
use tracing::info;

/// Batch size for embedding cache passes
const BATCH_SIZE: usize = 100;

/// Statuses favourited by an account local to this instance
const LIKED_BY_LOCALS_SQL: &str = r#"
SELECT statuses.id, statuses.text
FROM favourites
LEFT JOIN statuses ON favourites.status_id = statuses.id
LEFT JOIN accounts ON favourites.account_id = accounts.id
WHERE accounts.domain IS NULL
"#;

/// Originals of statuses reblogged by an account local to this instance
const REBLOGED_BY_LOCALS_SQL: &str = r#"
SELECT original.id, original.text
FROM statuses
LEFT JOIN statuses original ON statuses.reblog_of_id = original.id
LEFT JOIN accounts ON statuses.account_id = accounts.id
WHERE accounts.domain IS NULL AND statuses.reblog_of_id IS NOT NULL
"#;

pub struct Backfill {
    db: DbPool,
    cache: EmbeddingCache,
}

impl Backfill {
    pub fn new(db: DbPool, embedder: Arc<dyn Embedder>) -> Self {
        let cache = EmbeddingCache::new(db.clone(), embedder);
        Self { db, cache }
    }

    /// Backfill likes, then reblogs
    pub async fn run(&self) -> Result<()> {
        let liked = self.load_statuses(LIKED_BY_LOCALS_SQL).await?;
        info!(statuses = liked.len(), "Backfilling liked statuses");
        self.fill(liked).await;

        let rebloged = self.load_statuses(REBLOGED_BY_LOCALS_SQL).await?;
        info!(statuses = rebloged.len(), "Backfilling rebloged statuses");
        self.fill(rebloged).await;

        Ok(())
    }

    async fn load_statuses(&self, sql: &str) -> Result<Vec<Status>> {
        let rows = sqlx::query(sql).fetch_all(self.db.inner()).await?;
        let mut statuses = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: Option<i64> = row.try_get("id")?;
            let Some(id) = id else { continue };
            statuses.push(Status {
                id: id.to_string(),
                content: row.try_get::<Option<String>, _>("text")?.unwrap_or_default(),
                ..Default::default()
            });
        }
        Ok(statuses)
    }

    async fn fill(&self, mut statuses: Vec<Status>) {
        let total = statuses.len();
        let mut processed = 0;
        for batch in statuses.chunks_mut(BATCH_SIZE) {
            self.cache.fill_bulk(batch).await;
            processed += batch.len();
            info!(processed, total, "Backfill batch complete");
        }
    }
}
