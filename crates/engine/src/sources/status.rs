//! Single-status data source: the candidate status itself, read from its
//! origin server for live engagement counts.

use super::{keys, LazySource};
use crate::cache::EmbeddingCache;
use crate::federation::FederationClient;
use fedirank_common::models::{Candidate, Status};

pub(super) fn candidate_status_source(
    federation: FederationClient,
    cache: EmbeddingCache,
    candidates: &[Candidate],
) -> LazySource<Status> {
    LazySource::spawn("candidate_status", candidates, keys::status, move |candidate| {
        let federation = federation.clone();
        let cache = cache.clone();
        async move {
            let mut status = federation
                .status(&candidate.status_domain, &candidate.status_external_id)
                .await?;
            // The origin server reports its own id; re-key to the local
            // id so the embedding cache reads and persists against the
            // local statuses row.
            status.id = candidate.status_id.clone();
            cache.fill(&mut status).await;
            Ok(status)
        }
    })
}
