//! Account-shaped data sources: the viewer (local SQL) and the status
//! author (federation lookup).

use super::{keys, LazySource};
use crate::federation::FederationClient;
use fedirank_common::db::DbPool;
use fedirank_common::errors::{AppError, Result};
use fedirank_common::models::{Account, Candidate};
use sqlx::Row;
use std::time::Duration;

/// Viewer account with follower/following/status counts derived from the
/// local store. The counts are subselects rather than the denormalized
/// stat columns so the features see the same numbers the joins do.
const VIEWER_ACCOUNT_SQL: &str = r#"
SELECT accounts.username, accounts.domain, accounts.display_name,
       accounts.locked, accounts.discoverable, accounts.note,
       (SELECT count(*) FROM follows WHERE follows.account_id = accounts.id) AS following_count,
       (SELECT count(*) FROM follows WHERE follows.target_account_id = accounts.id) AS followers_count,
       (SELECT count(*) FROM statuses WHERE statuses.account_id = accounts.id) AS statuses_count
FROM accounts
WHERE accounts.id = $1
"#;

pub(super) fn viewer_account_source(
    db: DbPool,
    deadline: Duration,
    candidates: &[Candidate],
) -> LazySource<Account> {
    LazySource::spawn("viewer_account", candidates, keys::viewer, move |candidate| {
        let db = db.clone();
        async move { fetch_viewer_account(db, deadline, candidate).await }
    })
}

async fn fetch_viewer_account(
    db: DbPool,
    deadline: Duration,
    candidate: Candidate,
) -> Result<Account> {
    let viewer_id = parse_id(&candidate.account_id)?;
    let row = tokio::time::timeout(
        deadline,
        sqlx::query(VIEWER_ACCOUNT_SQL)
            .bind(viewer_id)
            .fetch_one(db.inner()),
    )
    .await
    .map_err(|_| AppError::Deadline {
        timeout_ms: deadline.as_millis() as u64,
    })??;

    Ok(Account {
        id: candidate.account_id.clone(),
        username: row.try_get("username")?,
        domain: row.try_get("domain")?,
        display_name: row
            .try_get::<Option<String>, _>("display_name")?
            .unwrap_or_default(),
        note: row.try_get::<Option<String>, _>("note")?.unwrap_or_default(),
        locked: row.try_get("locked")?,
        discoverable: row
            .try_get::<Option<bool>, _>("discoverable")?
            .unwrap_or_default(),
        followers_count: row.try_get("followers_count")?,
        following_count: row.try_get("following_count")?,
        statuses_count: row.try_get("statuses_count")?,
    })
}

pub(super) fn author_account_source(
    federation: FederationClient,
    candidates: &[Candidate],
) -> LazySource<Account> {
    LazySource::spawn("author_account", candidates, keys::author, move |candidate| {
        let federation = federation.clone();
        async move {
            federation
                .lookup_account(&candidate.author_domain, &candidate.author_username)
                .await
        }
    })
}

pub(crate) fn parse_id(id: &str) -> Result<i64> {
    id.parse().map_err(|_| AppError::Validation {
        message: format!("non-numeric id: {}", id),
        field: None,
    })
}
