//! Three-tier read-through cache for status text embeddings
//!
//! Lookup order per status: the in-memory vector on the status record,
//! the `statuses.embedding` column in the relational store, and finally
//! the remote embedding service. A service hit is written back to the
//! store so later requests stop at the second tier.
//!
//! Failure policy: a failure at any tier leaves the status with an empty
//! embedding and is not retried within the request. Downstream features
//! treat an empty vector as "no evidence".

use fedirank_common::db::DbPool;
use fedirank_common::embeddings::Embedder;
use fedirank_common::metrics;
use fedirank_common::models::Status;
use fedirank_common::EMBEDDING_DIM;
use pgvector::Vector;
use sqlx::Row;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Read-through embedding cache over the store and the remote service
#[derive(Clone)]
pub struct EmbeddingCache {
    db: DbPool,
    embedder: Arc<dyn Embedder>,
}

impl EmbeddingCache {
    pub fn new(db: DbPool, embedder: Arc<dyn Embedder>) -> Self {
        Self { db, embedder }
    }

    /// Fill one status: memory, then store, then service with write-back.
    pub async fn fill(&self, status: &mut Status) {
        if status.has_embedding() {
            metrics::record_cache(true, "memory");
            return;
        }

        if let Some(vector) = self.read_persisted(&status.id).await {
            metrics::record_cache(true, "store");
            status.embedding = vector;
            return;
        }
        metrics::record_cache(false, "store");

        let started = Instant::now();
        match self.embedder.embed(&status.content).await {
            Ok(vector) if vector.len() == EMBEDDING_DIM => {
                metrics::record_embedding(started.elapsed().as_secs_f64(), 1, true);
                self.persist(&status.id, &vector).await;
                status.embedding = vector;
            }
            Ok(vector) => {
                metrics::record_embedding(started.elapsed().as_secs_f64(), 1, false);
                warn!(
                    status_id = %status.id,
                    dimension = vector.len(),
                    "Embedding service returned unexpected dimension, leaving empty"
                );
            }
            Err(e) => {
                metrics::record_embedding(started.elapsed().as_secs_f64(), 1, false);
                warn!(status_id = %status.id, error = %e, "Embedding fetch failed, leaving empty");
            }
        }
    }

    /// Fill a batch of statuses: skip those with in-memory vectors, fill
    /// persisted vectors with a single store query, then send whatever is
    /// still empty to the service in one request and write each result
    /// back.
    pub async fn fill_bulk(&self, statuses: &mut [Status]) {
        if missing_embedding_indices(statuses).is_empty() {
            return;
        }

        self.fill_from_store(statuses).await;

        // Partition again: only statuses still empty after the store pass
        // go to the service.
        let uncached = missing_embedding_indices(statuses);
        if uncached.is_empty() {
            return;
        }

        let texts: Vec<String> = uncached
            .iter()
            .map(|&i| statuses[i].content.clone())
            .collect();

        let started = Instant::now();
        match self.embedder.embed_batch(&texts).await {
            Ok(vectors) => {
                metrics::record_embedding(started.elapsed().as_secs_f64(), texts.len(), true);
                if vectors.len() != texts.len() {
                    warn!(
                        requested = texts.len(),
                        received = vectors.len(),
                        "Embedding service returned a short batch"
                    );
                }
                // The response aligns positionally with the request input
                for (&index, vector) in uncached.iter().zip(vectors) {
                    if vector.len() != EMBEDDING_DIM {
                        warn!(
                            status_id = %statuses[index].id,
                            dimension = vector.len(),
                            "Embedding service returned unexpected dimension, leaving empty"
                        );
                        continue;
                    }
                    self.persist(&statuses[index].id, &vector).await;
                    statuses[index].embedding = vector;
                }
            }
            Err(e) => {
                metrics::record_embedding(started.elapsed().as_secs_f64(), texts.len(), false);
                warn!(
                    batch = texts.len(),
                    error = %e,
                    "Bulk embedding fetch failed, leaving batch empty"
                );
            }
        }
    }

    /// Single-status store read. Returns None on any failure or if the
    /// persisted vector is absent or malformed.
    async fn read_persisted(&self, status_id: &str) -> Option<Vec<f32>> {
        let id: i64 = status_id.parse().ok()?;
        let row = sqlx::query("SELECT embedding FROM statuses WHERE id = $1")
            .bind(id)
            .fetch_optional(self.db.inner())
            .await
            .map_err(|e| warn!(status_id, error = %e, "Embedding store read failed"))
            .ok()??;
        let vector: Option<Vector> = row.try_get("embedding").ok()?;
        let vector = vector?.to_vec();
        (vector.len() == EMBEDDING_DIM).then_some(vector)
    }

    /// Bulk store read: one query for every status id in the batch that
    /// still lacks a vector.
    async fn fill_from_store(&self, statuses: &mut [Status]) {
        let ids: Vec<i64> = missing_embedding_indices(statuses)
            .into_iter()
            .filter_map(|i| statuses[i].id.parse().ok())
            .collect();
        if ids.is_empty() {
            return;
        }

        let rows = match sqlx::query(
            "SELECT id, embedding FROM statuses WHERE id = ANY($1) AND embedding IS NOT NULL",
        )
        .bind(&ids[..])
        .fetch_all(self.db.inner())
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Bulk embedding store read failed");
                return;
            }
        };

        let mut hits = 0usize;
        for row in rows {
            let id: i64 = match row.try_get("id") {
                Ok(id) => id,
                Err(_) => continue,
            };
            let vector: Option<Vector> = row.try_get("embedding").unwrap_or(None);
            let Some(vector) = vector else { continue };
            let vector = vector.to_vec();
            if vector.len() != EMBEDDING_DIM {
                continue;
            }
            let key = id.to_string();
            for status in statuses.iter_mut().filter(|s| s.id == key) {
                status.embedding = vector.clone();
                metrics::record_cache(true, "store");
                hits += 1;
            }
        }
        debug!(hits, "Filled embeddings from store");
    }

    /// Write one computed vector back to the store. Failures are logged;
    /// the in-memory vector stays usable for the rest of the request.
    async fn persist(&self, status_id: &str, vector: &[f32]) {
        let Ok(id) = status_id.parse::<i64>() else {
            warn!(status_id, "Skipping embedding persist for non-numeric id");
            return;
        };
        let result = sqlx::query("UPDATE statuses SET embedding = $1 WHERE id = $2")
            .bind(Vector::from(vector.to_vec()))
            .bind(id)
            .execute(self.db.inner())
            .await;
        if let Err(e) = result {
            warn!(status_id, error = %e, "Failed to persist embedding");
        }
    }
}

/// Indices of statuses that still lack an embedding. This is the
/// partition both the memory and store passes key off.
pub fn missing_embedding_indices(statuses: &[Status]) -> Vec<usize> {
    statuses
        .iter()
        .enumerate()
        .filter(|(_, status)| !status.has_embedding())
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_with_embedding(id: &str, filled: bool) -> Status {
        Status {
            id: id.into(),
            content: format!("status {}", id),
            embedding: if filled { vec![0.1; EMBEDDING_DIM] } else { Vec::new() },
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_embedding_indices() {
        let statuses = vec![
            status_with_embedding("1", true),
            status_with_embedding("2", false),
            status_with_embedding("3", false),
            status_with_embedding("4", true),
        ];
        assert_eq!(missing_embedding_indices(&statuses), vec![1, 2]);
    }

    #[test]
    fn test_missing_embedding_indices_empty_batch() {
        assert!(missing_embedding_indices(&[]).is_empty());
    }
}
