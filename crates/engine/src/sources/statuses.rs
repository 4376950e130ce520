//! Status-list data sources: the author's recent statuses (federation)
//! and the viewer's liked and reblogged statuses (local SQL).
//!
//! The SQL-backed lists run through the embedding cache's bulk path
//! before they are published, so embedding-dependent extractors always
//! observe filled vectors where one could be computed.

use super::accounts::parse_id;
use super::{keys, LazySource};
use crate::cache::EmbeddingCache;
use crate::federation::FederationClient;
use fedirank_common::db::DbPool;
use fedirank_common::errors::{AppError, Result};
use fedirank_common::models::{Account, Candidate, Status, Tag};
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::time::Duration;

/// Statuses the viewer has favourited, with engagement counts, author
/// key, and tag names aggregated per status.
const LIKED_STATUSES_SQL: &str = r#"
SELECT statuses.id,
       statuses.text,
       (SELECT count(*) FROM statuses replies WHERE replies.in_reply_to_id = statuses.id) AS replies_count,
       (SELECT count(*) FROM statuses reblogs WHERE reblogs.reblog_of_id = statuses.id) AS reblogs_count,
       (SELECT count(*) FROM favourites f WHERE f.status_id = statuses.id) AS favourites_count,
       accounts.username AS author_username,
       accounts.domain AS author_domain,
       t.tag_array
FROM favourites
LEFT JOIN statuses ON favourites.status_id = statuses.id
LEFT JOIN accounts ON statuses.account_id = accounts.id
LEFT OUTER JOIN (
    SELECT st.status_id AS status_id, array_agg(tags.name) AS tag_array
    FROM statuses_tags st
    JOIN tags ON tags.id = st.tag_id
    GROUP BY st.status_id
) t ON statuses.id = t.status_id
WHERE favourites.account_id = $1
"#;

/// Statuses the viewer has reblogged (the originals, not the reblog
/// wrappers), same projection as the liked query.
const REBLOGED_STATUSES_SQL: &str = r#"
SELECT statuses.id,
       statuses.text,
       (SELECT count(*) FROM statuses replies WHERE replies.in_reply_to_id = statuses.id) AS replies_count,
       (SELECT count(*) FROM statuses reblogs WHERE reblogs.reblog_of_id = statuses.id) AS reblogs_count,
       (SELECT count(*) FROM favourites f WHERE f.status_id = statuses.id) AS favourites_count,
       accounts.username AS author_username,
       accounts.domain AS author_domain,
       t.tag_array
FROM statuses reblog
INNER JOIN statuses ON reblog.reblog_of_id = statuses.id
LEFT JOIN accounts ON statuses.account_id = accounts.id
LEFT OUTER JOIN (
    SELECT st.status_id AS status_id, array_agg(tags.name) AS tag_array
    FROM statuses_tags st
    JOIN tags ON tags.id = st.tag_id
    GROUP BY st.status_id
) t ON statuses.id = t.status_id
WHERE reblog.account_id = $1
"#;

pub(super) fn author_statuses_source(
    federation: FederationClient,
    candidates: &[Candidate],
) -> LazySource<Vec<Status>> {
    LazySource::spawn("author_statuses", candidates, keys::author, move |candidate| {
        let federation = federation.clone();
        async move {
            // Two-stage: resolve the author on their home instance, then
            // read their timeline with the resolved id.
            let author = federation
                .lookup_account(&candidate.author_domain, &candidate.author_username)
                .await?;
            if author.id.is_empty() {
                return Err(AppError::Federation {
                    message: format!("lookup returned no id for {}", candidate.author_key()),
                });
            }
            federation
                .account_statuses(&candidate.author_domain, &author.id)
                .await
        }
    })
}

pub(super) fn liked_statuses_source(
    db: DbPool,
    cache: EmbeddingCache,
    deadline: Duration,
    candidates: &[Candidate],
) -> LazySource<Vec<Status>> {
    LazySource::spawn("liked_statuses", candidates, keys::viewer, move |candidate| {
        let db = db.clone();
        let cache = cache.clone();
        async move {
            fetch_interacted_statuses(db, cache, deadline, LIKED_STATUSES_SQL, candidate).await
        }
    })
}

pub(super) fn rebloged_statuses_source(
    db: DbPool,
    cache: EmbeddingCache,
    deadline: Duration,
    candidates: &[Candidate],
) -> LazySource<Vec<Status>> {
    LazySource::spawn("rebloged_statuses", candidates, keys::viewer, move |candidate| {
        let db = db.clone();
        let cache = cache.clone();
        async move {
            fetch_interacted_statuses(db, cache, deadline, REBLOGED_STATUSES_SQL, candidate).await
        }
    })
}

async fn fetch_interacted_statuses(
    db: DbPool,
    cache: EmbeddingCache,
    deadline: Duration,
    sql: &'static str,
    candidate: Candidate,
) -> Result<Vec<Status>> {
    let viewer_id = parse_id(&candidate.account_id)?;
    let rows = tokio::time::timeout(
        deadline,
        sqlx::query(sql).bind(viewer_id).fetch_all(db.inner()),
    )
    .await
    .map_err(|_| AppError::Deadline {
        timeout_ms: deadline.as_millis() as u64,
    })??;

    let mut statuses = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(status) = status_from_row(row)? {
            statuses.push(status);
        }
    }

    // Fill embeddings before publishing so every consumer sees them
    cache.fill_bulk(&mut statuses).await;

    Ok(statuses)
}

/// Map a joined row onto the status model. Rows whose status side of the
/// join is gone (dangling favourite or reblog) are skipped.
fn status_from_row(row: &PgRow) -> Result<Option<Status>> {
    let id: Option<i64> = row.try_get("id")?;
    let Some(id) = id else {
        return Ok(None);
    };

    let tags: Vec<Tag> = row
        .try_get::<Option<Vec<String>>, _>("tag_array")?
        .unwrap_or_default()
        .into_iter()
        .map(Tag::new)
        .collect();

    Ok(Some(Status {
        id: id.to_string(),
        content: row.try_get::<Option<String>, _>("text")?.unwrap_or_default(),
        favourites_count: row.try_get("favourites_count")?,
        reblogs_count: row.try_get("reblogs_count")?,
        replies_count: row.try_get("replies_count")?,
        tags,
        account: Account {
            username: row
                .try_get::<Option<String>, _>("author_username")?
                .unwrap_or_default(),
            domain: row.try_get("author_domain")?,
            ..Default::default()
        },
        embedding: Vec::new(),
    }))
}
