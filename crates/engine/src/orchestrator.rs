//! Orchestrator: fan-out, collection, scoring, down-ranking
//!
//! For N candidates and K extractors the orchestrator spawns N×K
//! independent tasks; each pulls from the shared data sources, which
//! fetch at most once per distinct key. Collection walks candidates in
//! input order, so the aggregated list mirrors the request until the
//! down-ranker reorders it.

use crate::cache::EmbeddingCache;
use crate::downrank;
use crate::extractors;
use crate::federation::FederationClient;
use crate::scoring::RankingWeights;
use crate::sources::DataSources;
use crate::store;
use fedirank_common::config::AppConfig;
use fedirank_common::db::DbPool;
use fedirank_common::embeddings::Embedder;
use fedirank_common::errors::{AppError, Result};
use fedirank_common::models::{AggregatedCandidate, Candidate, RankedCandidate};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// The aggregation engine: owns the clients the data sources fetch with
/// and the weight table the scorer applies.
pub struct Engine {
    db: DbPool,
    federation: FederationClient,
    cache: EmbeddingCache,
    weights: RankingWeights,
    sql_deadline: Duration,
}

impl Engine {
    pub fn new(config: &AppConfig, db: DbPool, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let federation = FederationClient::new(config.http_timeout())?;
        let cache = EmbeddingCache::new(db.clone(), embedder);
        Ok(Self {
            db,
            federation,
            cache,
            weights: RankingWeights::default(),
            sql_deadline: config.sql_timeout(),
        })
    }

    /// Replace the weight table (tests and offline experiments)
    pub fn with_weights(mut self, weights: RankingWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Compute the full feature map for every candidate, in input order.
    #[instrument(skip(self, candidates), fields(batch = candidates.len()))]
    pub async fn aggregate(&self, candidates: &[Candidate]) -> Result<Vec<AggregatedCandidate>> {
        let sources = Arc::new(DataSources::spawn(
            &self.db,
            &self.federation,
            &self.cache,
            self.sql_deadline,
            candidates,
        ));
        aggregate_candidates(sources, candidates).await
    }

    /// Score and down-rank already-aggregated candidates.
    pub fn rank_aggregated(&self, aggregated: &[AggregatedCandidate]) -> Vec<RankedCandidate> {
        downrank::downrank_by_author(score_candidates(&self.weights, aggregated))
    }

    /// Rank a candidate batch: aggregate, score, down-rank.
    pub async fn rank(&self, candidates: &[Candidate]) -> Result<Vec<RankedCandidate>> {
        let aggregated = self.aggregate(candidates).await?;
        Ok(self.rank_aggregated(&aggregated))
    }

    /// Persist the feature maps for a ranked batch.
    pub async fn persist_aggregates(&self, aggregated: &[AggregatedCandidate]) -> Result<()> {
        store::upsert_aggregates(&self.db, aggregated).await
    }
}

/// Spawn one task per (feature, candidate) cell and collect the results
/// into per-candidate aggregate maps, in input order. A panicked feature
/// task fails the batch; a failed fetch never does (the sources degrade
/// it to zero first).
pub async fn aggregate_candidates(
    sources: Arc<DataSources>,
    candidates: &[Candidate],
) -> Result<Vec<AggregatedCandidate>> {
    let mut cells = Vec::with_capacity(candidates.len() * extractors::REGISTRY.len());
    for (index, candidate) in candidates.iter().enumerate() {
        for (name, extractor) in extractors::REGISTRY {
            let handle = tokio::spawn(extractor(candidate.clone(), Arc::clone(&sources)));
            cells.push((index, *name, handle));
        }
    }
    debug!(cells = cells.len(), "Feature tasks spawned");

    let mut aggregates: Vec<HashMap<String, i64>> = vec![HashMap::new(); candidates.len()];
    for (index, name, handle) in cells {
        let value = handle.await.map_err(|e| AppError::Internal {
            message: format!("feature task {} panicked: {}", name, e),
        })?;
        aggregates[index].insert(name.to_string(), value);
    }

    Ok(candidates
        .iter()
        .cloned()
        .zip(aggregates)
        .map(|(candidate, aggregates)| AggregatedCandidate {
            candidate,
            aggregates,
        })
        .collect())
}

/// Apply the weight table to each aggregate map.
pub fn score_candidates(
    weights: &RankingWeights,
    aggregated: &[AggregatedCandidate],
) -> Vec<RankedCandidate> {
    aggregated
        .iter()
        .map(|candidate| RankedCandidate {
            candidate: candidate.candidate.clone(),
            rank: weights.score(&candidate.aggregates),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downrank::downrank_by_author;
    use crate::sources::PreloadedSources;
    use fedirank_common::models::{Account, Status, Tag};
    use std::collections::HashSet;

    fn candidate(status_id: &str, account_id: &str, author: &str) -> Candidate {
        Candidate {
            status_id: status_id.into(),
            status_external_id: "9".into(),
            status_domain: "s.net".into(),
            account_id: account_id.into(),
            account_url: format!("https://local/users/{}", account_id),
            author_username: author.into(),
            author_domain: "a.net".into(),
        }
    }

    #[tokio::test]
    async fn test_cold_viewer_single_candidate() {
        // One candidate; the viewer has no likes or reblogs; the author
        // lookup reports 42 followers. Everything else is zero and the
        // rank is 42 * 0.004.
        let c = candidate("1", "100", "alice");
        let mut author_accounts = HashMap::new();
        author_accounts.insert(
            "alice@a.net".to_string(),
            Account {
                followers_count: 42,
                ..Default::default()
            },
        );
        let sources = Arc::new(DataSources::preloaded(PreloadedSources {
            author_accounts,
            ..Default::default()
        }));

        let aggregated = aggregate_candidates(sources, std::slice::from_ref(&c))
            .await
            .unwrap();
        assert_eq!(aggregated.len(), 1);

        // The aggregate keys are exactly the seventeen feature names
        let keys: HashSet<&str> = aggregated[0].aggregates.keys().map(|k| k.as_str()).collect();
        let expected: HashSet<&str> = extractors::REGISTRY.iter().map(|(n, _)| *n).collect();
        assert_eq!(keys, expected);

        assert_eq!(aggregated[0].aggregates["author_follower_count"], 42);
        for (name, value) in &aggregated[0].aggregates {
            if name != "author_follower_count" {
                assert_eq!(*value, 0, "feature {} expected zero", name);
            }
        }

        let ranked = score_candidates(&RankingWeights::default(), &aggregated);
        assert!((ranked[0].rank - 0.168).abs() < 1e-5);

        let downranked = downrank_by_author(ranked);
        assert_eq!(downranked.len(), 1);
        assert!((downranked[0].rank - 0.168).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_aggregates_follow_input_order() {
        let candidates = vec![
            candidate("3", "100", "alice"),
            candidate("1", "100", "bob"),
            candidate("2", "200", "carol"),
        ];
        let sources = Arc::new(DataSources::preloaded(PreloadedSources::default()));
        let aggregated = aggregate_candidates(sources, &candidates).await.unwrap();
        let ids: Vec<&str> = aggregated
            .iter()
            .map(|a| a.candidate.status_id.as_str())
            .collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
    }

    #[tokio::test]
    async fn test_viewer_history_features() {
        let c = candidate("1", "100", "alice");

        let liked = vec![
            // By the candidate's author, shares a tag
            Status {
                account: Account {
                    username: "alice".into(),
                    domain: Some("a.net".into()),
                    ..Default::default()
                },
                tags: vec![Tag::new("rust")],
                ..Default::default()
            },
            // Different author, no shared tags
            Status {
                account: Account {
                    username: "bob".into(),
                    domain: Some("b.net".into()),
                    ..Default::default()
                },
                tags: vec![Tag::new("go")],
                ..Default::default()
            },
        ];

        let mut liked_statuses = HashMap::new();
        liked_statuses.insert("100".to_string(), liked);

        let mut candidate_statuses = HashMap::new();
        candidate_statuses.insert(
            "1".to_string(),
            Status {
                id: "1".into(),
                favourites_count: 7,
                reblogs_count: 2,
                replies_count: 5,
                tags: vec![Tag::new("rust"), Tag::new("rust")],
                ..Default::default()
            },
        );

        let sources = Arc::new(DataSources::preloaded(PreloadedSources {
            liked_statuses,
            candidate_statuses,
            ..Default::default()
        }));

        let aggregated = aggregate_candidates(sources, std::slice::from_ref(&c))
            .await
            .unwrap();
        let aggregates = &aggregated[0].aggregates;

        assert_eq!(aggregates["account_liked_status_count"], 2);
        assert_eq!(aggregates["account_liked_author_status_count"], 1);
        // Multiset pairs: liked {rust} x candidate {rust, rust}
        assert_eq!(aggregates["account_liked_tag_status_count"], 2);
        assert_eq!(aggregates["candidate_status_like_count"], 7);
        assert_eq!(aggregates["candidate_status_reblog_count"], 2);
        assert_eq!(aggregates["candidate_status_reply_count"], 5);
        assert_eq!(aggregates["account_rebloged_status_count"], 0);
    }

    #[tokio::test]
    async fn test_author_timeline_features() {
        let c = candidate("1", "100", "alice");

        let timeline = vec![
            Status {
                favourites_count: 3,
                reblogs_count: 1,
                replies_count: 2,
                ..Default::default()
            },
            Status {
                favourites_count: 4,
                reblogs_count: 2,
                replies_count: 0,
                ..Default::default()
            },
        ];
        let mut author_statuses = HashMap::new();
        author_statuses.insert("alice@a.net".to_string(), timeline);

        let sources = Arc::new(DataSources::preloaded(PreloadedSources {
            author_statuses,
            ..Default::default()
        }));

        let aggregated = aggregate_candidates(sources, std::slice::from_ref(&c))
            .await
            .unwrap();
        let aggregates = &aggregated[0].aggregates;
        assert_eq!(aggregates["author_like_count"], 7);
        assert_eq!(aggregates["author_reblog_count"], 3);
        assert_eq!(aggregates["author_reply_count"], 2);
    }
}
