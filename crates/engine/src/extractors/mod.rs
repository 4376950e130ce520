//! Feature extractors
//!
//! Each extractor is a pure function from `(candidate, data sources)` to
//! one integer feature. The registry drives the orchestrator's fan-out
//! and defines the aggregate key set; the scorer's weight table is keyed
//! by the same names.

pub mod similarity;

use crate::sources::DataSources;
use fedirank_common::models::{Candidate, Status};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

/// One feature computation, spawnable as an independent task
pub type ExtractorFn = fn(Candidate, Arc<DataSources>) -> BoxFuture<'static, i64>;

/// All seventeen features, in the order the weight table lists them
pub const REGISTRY: &[(&str, ExtractorFn)] = &[
    ("author_follower_count", author_follower_count),
    ("author_like_count", author_like_count),
    ("author_reblog_count", author_reblog_count),
    ("author_reply_count", author_reply_count),
    ("account_liked_status_count", account_liked_status_count),
    ("account_rebloged_status_count", account_rebloged_status_count),
    (
        "account_liked_author_status_count",
        account_liked_author_status_count,
    ),
    (
        "account_rebloged_author_status_count",
        account_rebloged_author_status_count,
    ),
    (
        "account_liked_tag_status_count",
        account_liked_tag_status_count,
    ),
    (
        "account_rebloged_tag_status_count",
        account_rebloged_tag_status_count,
    ),
    ("candidate_status_like_count", candidate_status_like_count),
    ("candidate_status_reblog_count", candidate_status_reblog_count),
    ("candidate_status_reply_count", candidate_status_reply_count),
    (
        "average_like_embedding_similarity",
        average_like_embedding_similarity,
    ),
    (
        "average_reblog_embedding_similarity",
        average_reblog_embedding_similarity,
    ),
    (
        "account_liked_status_with_similar_embedding",
        account_liked_status_with_similar_embedding,
    ),
    (
        "account_rebloged_status_with_similar_embedding",
        account_rebloged_status_with_similar_embedding,
    ),
];

fn author_follower_count(candidate: Candidate, sources: Arc<DataSources>) -> BoxFuture<'static, i64> {
    async move { sources.author_account.get(&candidate).await.followers_count }.boxed()
}

fn author_like_count(candidate: Candidate, sources: Arc<DataSources>) -> BoxFuture<'static, i64> {
    async move {
        sources
            .author_statuses
            .get(&candidate)
            .await
            .iter()
            .map(|status| status.favourites_count)
            .sum()
    }
    .boxed()
}

fn author_reblog_count(candidate: Candidate, sources: Arc<DataSources>) -> BoxFuture<'static, i64> {
    async move {
        sources
            .author_statuses
            .get(&candidate)
            .await
            .iter()
            .map(|status| status.reblogs_count)
            .sum()
    }
    .boxed()
}

fn author_reply_count(candidate: Candidate, sources: Arc<DataSources>) -> BoxFuture<'static, i64> {
    async move {
        sources
            .author_statuses
            .get(&candidate)
            .await
            .iter()
            .map(|status| status.replies_count)
            .sum()
    }
    .boxed()
}

fn account_liked_status_count(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move { sources.liked_statuses.get(&candidate).await.len() as i64 }.boxed()
}

fn account_rebloged_status_count(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move { sources.rebloged_statuses.get(&candidate).await.len() as i64 }.boxed()
}

fn account_liked_author_status_count(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move {
        let liked = sources.liked_statuses.get(&candidate).await;
        by_author_count(&liked, &candidate)
    }
    .boxed()
}

fn account_rebloged_author_status_count(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move {
        let rebloged = sources.rebloged_statuses.get(&candidate).await;
        by_author_count(&rebloged, &candidate)
    }
    .boxed()
}

fn account_liked_tag_status_count(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move {
        let (liked, status) = futures::join!(
            sources.liked_statuses.get(&candidate),
            sources.candidate_status.get(&candidate)
        );
        tag_overlap_count(&liked, &status)
    }
    .boxed()
}

fn account_rebloged_tag_status_count(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move {
        let (rebloged, status) = futures::join!(
            sources.rebloged_statuses.get(&candidate),
            sources.candidate_status.get(&candidate)
        );
        tag_overlap_count(&rebloged, &status)
    }
    .boxed()
}

fn candidate_status_like_count(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move { sources.candidate_status.get(&candidate).await.favourites_count }.boxed()
}

fn candidate_status_reblog_count(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move { sources.candidate_status.get(&candidate).await.reblogs_count }.boxed()
}

fn candidate_status_reply_count(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move { sources.candidate_status.get(&candidate).await.replies_count }.boxed()
}

fn average_like_embedding_similarity(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move {
        let (liked, status) = futures::join!(
            sources.liked_statuses.get(&candidate),
            sources.candidate_status.get(&candidate)
        );
        similarity::similarity_feature(&liked, &status)
    }
    .boxed()
}

fn average_reblog_embedding_similarity(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move {
        let (rebloged, status) = futures::join!(
            sources.rebloged_statuses.get(&candidate),
            sources.candidate_status.get(&candidate)
        );
        similarity::similarity_feature(&rebloged, &status)
    }
    .boxed()
}

fn account_liked_status_with_similar_embedding(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move {
        let (liked, status) = futures::join!(
            sources.liked_statuses.get(&candidate),
            sources.candidate_status.get(&candidate)
        );
        similarity::similar_status_count(&liked, &status)
    }
    .boxed()
}

fn account_rebloged_status_with_similar_embedding(
    candidate: Candidate,
    sources: Arc<DataSources>,
) -> BoxFuture<'static, i64> {
    async move {
        let (rebloged, status) = futures::join!(
            sources.rebloged_statuses.get(&candidate),
            sources.candidate_status.get(&candidate)
        );
        similarity::similar_status_count(&rebloged, &status)
    }
    .boxed()
}

/// Count of interacted statuses written by the candidate's author
fn by_author_count(interacted: &[Status], candidate: &Candidate) -> i64 {
    let author_key = candidate.author_key();
    interacted
        .iter()
        .filter(|status| status.author_key() == author_key)
        .count() as i64
}

/// Multiset cross-product of matching tag name pairs. Duplicate names on
/// either side multiply; this is the contract the weights were fit
/// against, not a set intersection.
fn tag_overlap_count(interacted: &[Status], candidate_status: &Status) -> i64 {
    let mut count = 0;
    for status in interacted {
        for tag in &status.tags {
            for candidate_tag in &candidate_status.tags {
                if tag.name == candidate_tag.name {
                    count += 1;
                }
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedirank_common::models::{Account, Tag};
    use std::collections::HashSet;

    #[test]
    fn test_registry_names_are_unique_and_complete() {
        let names: HashSet<&str> = REGISTRY.iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), 17);
        assert_eq!(REGISTRY.len(), 17);
    }

    fn candidate() -> Candidate {
        Candidate {
            status_id: "1".into(),
            status_external_id: "9".into(),
            status_domain: "s.net".into(),
            account_id: "100".into(),
            account_url: "https://local/users/viewer".into(),
            author_username: "alice".into(),
            author_domain: "a.net".into(),
        }
    }

    fn status_by(username: &str, domain: Option<&str>, tags: &[&str]) -> Status {
        Status {
            account: Account {
                username: username.into(),
                domain: domain.map(Into::into),
                ..Default::default()
            },
            tags: tags.iter().map(|t| Tag::new(*t)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_by_author_count_matches_author_key() {
        let interacted = vec![
            status_by("alice", Some("a.net"), &[]),
            status_by("alice", Some("b.net"), &[]),
            status_by("bob", Some("a.net"), &[]),
            status_by("alice", Some("a.net"), &[]),
        ];
        assert_eq!(by_author_count(&interacted, &candidate()), 2);
    }

    #[test]
    fn test_tag_overlap_is_multiset_cross_product() {
        // Candidate tagged {rust, rust}; one liked status tagged {rust, go}:
        // the pair count is 2, not 1
        let candidate_status = status_by("alice", Some("a.net"), &["rust", "rust"]);
        let liked = vec![status_by("bob", None, &["rust", "go"])];
        assert_eq!(tag_overlap_count(&liked, &candidate_status), 2);
    }

    #[test]
    fn test_tag_overlap_duplicates_multiply_both_sides() {
        let candidate_status = status_by("alice", Some("a.net"), &["rust", "rust"]);
        let liked = vec![
            status_by("bob", None, &["rust"]),
            status_by("carol", None, &["rust", "rust"]),
        ];
        // 2*1 + 2*2
        assert_eq!(tag_overlap_count(&liked, &candidate_status), 6);
    }

    #[test]
    fn test_tag_overlap_no_shared_tags() {
        let candidate_status = status_by("alice", Some("a.net"), &["art"]);
        let liked = vec![status_by("bob", None, &["rust", "go"])];
        assert_eq!(tag_overlap_count(&liked, &candidate_status), 0);
    }
}
