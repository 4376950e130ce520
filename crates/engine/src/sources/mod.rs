//! Request-scoped lazy data sources
//!
//! A data source is a lazy mapping from a natural key (account id, author
//! `username@domain`, status id) to a typed payload. Construction
//! enumerates the distinct keys of the candidate batch and starts exactly
//! one background fetch per key; `get` awaits the fetch for the
//! candidate's key and may be called concurrently from any number of
//! extractor tasks.
//!
//! Each key's fetch completes into a shared future, so every consumer
//! observes the same payload without re-fetching. A failed, timed-out, or
//! panicked fetch resolves the key to the payload's zero value: one
//! missing signal degrades its features to zero instead of poisoning the
//! whole ranking.

mod accounts;
mod statuses;
mod status;

use crate::cache::EmbeddingCache;
use crate::federation::FederationClient;
use fedirank_common::db::DbPool;
use fedirank_common::errors::Result;
use fedirank_common::metrics;
use fedirank_common::models::{Account, Candidate, Status};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

type SharedFetch<T> = Shared<BoxFuture<'static, T>>;

/// A lazy, deduplicated, multi-consumer mapping from natural key to
/// payload for one request batch.
pub struct LazySource<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    cells: HashMap<String, SharedFetch<T>>,
    key_fn: fn(&Candidate) -> String,
    name: &'static str,
}

impl<T> LazySource<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// Start one background fetch per distinct key in the batch and
    /// return immediately.
    pub fn spawn<F, Fut>(
        name: &'static str,
        candidates: &[Candidate],
        key_fn: fn(&Candidate) -> String,
        fetch: F,
    ) -> Self
    where
        F: Fn(Candidate) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut cells: HashMap<String, SharedFetch<T>> = HashMap::new();
        for candidate in candidates {
            let key = key_fn(candidate);
            if cells.contains_key(&key) {
                continue;
            }
            let handle = tokio::spawn(fetch(candidate.clone()));
            let cell_key = key.clone();
            let cell = async move {
                match handle.await {
                    Ok(Ok(payload)) => payload,
                    Ok(Err(e)) => {
                        warn!(
                            source = name,
                            key = %cell_key,
                            error = %e,
                            "Fetch failed, substituting zero payload"
                        );
                        metrics::record_source_failure(name);
                        T::default()
                    }
                    Err(e) => {
                        warn!(
                            source = name,
                            key = %cell_key,
                            error = %e,
                            "Fetch task aborted, substituting zero payload"
                        );
                        metrics::record_source_failure(name);
                        T::default()
                    }
                }
            }
            .boxed()
            .shared();
            cells.insert(key, cell);
        }
        Self {
            cells,
            key_fn,
            name,
        }
    }

    /// Build a source whose payloads are already resolved. Used by tests
    /// to inject fixed data without a database or network.
    pub fn preloaded(values: HashMap<String, T>, key_fn: fn(&Candidate) -> String) -> Self {
        let cells = values
            .into_iter()
            .map(|(key, value)| {
                let cell: SharedFetch<T> = async move { value }.boxed().shared();
                (key, cell)
            })
            .collect();
        Self {
            cells,
            key_fn,
            name: "preloaded",
        }
    }

    /// Payload for the candidate's key. Blocks until the fetch for that
    /// key completes; safe to call concurrently and repeatedly.
    pub async fn get(&self, candidate: &Candidate) -> T {
        let key = (self.key_fn)(candidate);
        match self.cells.get(&key) {
            Some(cell) => cell.clone().await,
            None => {
                warn!(source = self.name, key = %key, "Key not in source, substituting zero payload");
                T::default()
            }
        }
    }

    /// Number of distinct keys, which equals the number of underlying
    /// fetches started for this source.
    pub fn distinct_keys(&self) -> usize {
        self.cells.len()
    }
}

/// Key discipline for the six sources
pub(crate) mod keys {
    use fedirank_common::models::Candidate;

    pub fn viewer(candidate: &Candidate) -> String {
        candidate.account_id.clone()
    }

    pub fn author(candidate: &Candidate) -> String {
        candidate.author_key()
    }

    pub fn status(candidate: &Candidate) -> String {
        candidate.status_id.clone()
    }
}

/// The six data sources backing one aggregation request, grouped by
/// payload shape: accounts, status lists, and single statuses.
pub struct DataSources {
    /// Viewer account, keyed by `account_id` (local SQL)
    pub viewer_account: LazySource<Account>,
    /// Status author, keyed by `username@domain` (federation lookup)
    pub author_account: LazySource<Account>,
    /// Author's recent statuses, keyed by `username@domain` (federation,
    /// two-stage lookup then timeline)
    pub author_statuses: LazySource<Vec<Status>>,
    /// Statuses the viewer liked, keyed by `account_id` (local SQL, with
    /// embeddings filled before publication)
    pub liked_statuses: LazySource<Vec<Status>>,
    /// Statuses the viewer reblogged, keyed by `account_id` (local SQL,
    /// with embeddings filled before publication)
    pub rebloged_statuses: LazySource<Vec<Status>>,
    /// The candidate status itself, keyed by `status_id` (origin server)
    pub candidate_status: LazySource<Status>,
}

impl DataSources {
    /// Start all fetches for the batch. Returns immediately; fetches run
    /// in the background and are awaited by the extractors.
    pub fn spawn(
        db: &DbPool,
        federation: &FederationClient,
        cache: &EmbeddingCache,
        sql_deadline: Duration,
        candidates: &[Candidate],
    ) -> Self {
        Self {
            viewer_account: accounts::viewer_account_source(db.clone(), sql_deadline, candidates),
            author_account: accounts::author_account_source(federation.clone(), candidates),
            author_statuses: statuses::author_statuses_source(federation.clone(), candidates),
            liked_statuses: statuses::liked_statuses_source(
                db.clone(),
                cache.clone(),
                sql_deadline,
                candidates,
            ),
            rebloged_statuses: statuses::rebloged_statuses_source(
                db.clone(),
                cache.clone(),
                sql_deadline,
                candidates,
            ),
            candidate_status: status::candidate_status_source(
                federation.clone(),
                cache.clone(),
                candidates,
            ),
        }
    }

    /// Build sources from fixed payloads. Used by tests.
    pub fn preloaded(preloaded: PreloadedSources) -> Self {
        Self {
            viewer_account: LazySource::preloaded(preloaded.viewer_accounts, keys::viewer),
            author_account: LazySource::preloaded(preloaded.author_accounts, keys::author),
            author_statuses: LazySource::preloaded(preloaded.author_statuses, keys::author),
            liked_statuses: LazySource::preloaded(preloaded.liked_statuses, keys::viewer),
            rebloged_statuses: LazySource::preloaded(preloaded.rebloged_statuses, keys::viewer),
            candidate_status: LazySource::preloaded(preloaded.candidate_statuses, keys::status),
        }
    }
}

/// Fixed payloads for [`DataSources::preloaded`]. Maps are keyed the same
/// way as the live sources; missing keys resolve to zero payloads.
#[derive(Default)]
pub struct PreloadedSources {
    pub viewer_accounts: HashMap<String, Account>,
    pub author_accounts: HashMap<String, Account>,
    pub author_statuses: HashMap<String, Vec<Status>>,
    pub liked_statuses: HashMap<String, Vec<Status>>,
    pub rebloged_statuses: HashMap<String, Vec<Status>>,
    pub candidate_statuses: HashMap<String, Status>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedirank_common::errors::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn candidate(status_id: &str, account_id: &str) -> Candidate {
        Candidate {
            status_id: status_id.into(),
            status_external_id: status_id.into(),
            status_domain: "s.net".into(),
            account_id: account_id.into(),
            account_url: format!("https://local/users/{}", account_id),
            author_username: "alice".into(),
            author_domain: "a.net".into(),
        }
    }

    #[tokio::test]
    async fn test_fetch_runs_once_per_distinct_key() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fetches);

        // 50 candidates sharing one viewer: one fetch
        let candidates: Vec<Candidate> =
            (0..50).map(|i| candidate(&i.to_string(), "100")).collect();

        let source = LazySource::spawn("test", &candidates, keys::viewer, move |_| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(7i64)
            }
        });

        assert_eq!(source.distinct_keys(), 1);
        for candidate in &candidates {
            assert_eq!(source.get(candidate).await, 7);
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_fetch_independently() {
        let candidates = vec![
            candidate("1", "100"),
            candidate("2", "200"),
            candidate("3", "100"),
        ];
        let source = LazySource::spawn("test", &candidates, keys::viewer, |candidate| async move {
            Ok(candidate.account_id.parse::<i64>().unwrap())
        });

        assert_eq!(source.distinct_keys(), 2);
        assert_eq!(source.get(&candidates[0]).await, 100);
        assert_eq!(source.get(&candidates[1]).await, 200);
        assert_eq!(source.get(&candidates[2]).await, 100);
    }

    #[tokio::test]
    async fn test_failed_fetch_yields_zero_payload_for_all_consumers() {
        let candidates = vec![candidate("1", "100")];
        let source: LazySource<Vec<i64>> =
            LazySource::spawn("test", &candidates, keys::viewer, |_| async move {
                Err(AppError::Internal {
                    message: "boom".into(),
                })
            });

        // Every consumer gets the zero value, none of them hang
        for _ in 0..3 {
            assert!(source.get(&candidates[0]).await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_unknown_key_yields_zero_payload() {
        let source: LazySource<i64> = LazySource::preloaded(HashMap::new(), keys::viewer);
        assert_eq!(source.get(&candidate("1", "100")).await, 0);
    }

    #[tokio::test]
    async fn test_preloaded_sources() {
        let mut author_accounts = HashMap::new();
        author_accounts.insert(
            "alice@a.net".to_string(),
            Account {
                followers_count: 42,
                ..Default::default()
            },
        );
        let sources = DataSources::preloaded(PreloadedSources {
            author_accounts,
            ..Default::default()
        });
        let c = candidate("1", "100");
        assert_eq!(sources.author_account.get(&c).await.followers_count, 42);
        assert!(sources.liked_statuses.get(&c).await.is_empty());
    }
}
