//! Aggregate persistence
//!
//! Upserts one row per `(status, viewer)` pair into the `aggregates`
//! table after a ranking request: pairs already present are updated in
//! place, the rest are inserted in a single multi-row statement. The
//! full feature map is stored as JSONB.

use chrono::Utc;
use fedirank_common::db::DbPool;
use fedirank_common::errors::Result;
use fedirank_common::models::AggregatedCandidate;
use sqlx::{Postgres, QueryBuilder, Row};
use std::collections::HashSet;
use tracing::{debug, warn};

struct AggregateRow {
    status_id: i64,
    account_id: i64,
    aggregate: serde_json::Value,
}

/// Upsert the computed aggregates. Candidates with non-numeric local ids
/// are skipped rather than failing the batch.
pub async fn upsert_aggregates(db: &DbPool, aggregated: &[AggregatedCandidate]) -> Result<()> {
    let mut rows = Vec::with_capacity(aggregated.len());
    for candidate in aggregated {
        let (Ok(status_id), Ok(account_id)) = (
            candidate.candidate.status_id.parse::<i64>(),
            candidate.candidate.account_id.parse::<i64>(),
        ) else {
            warn!(
                status_id = %candidate.candidate.status_id,
                account_id = %candidate.candidate.account_id,
                "Skipping aggregate upsert for non-numeric ids"
            );
            continue;
        };
        rows.push(AggregateRow {
            status_id,
            account_id,
            aggregate: serde_json::to_value(&candidate.aggregates)?,
        });
    }

    if rows.is_empty() {
        return Ok(());
    }

    let status_ids: Vec<i64> = rows.iter().map(|row| row.status_id).collect();
    let account_ids: Vec<i64> = rows.iter().map(|row| row.account_id).collect();

    // Read back the pairs already present to split updates from inserts
    let existing_rows = sqlx::query(
        "SELECT status_id, account_id FROM aggregates WHERE status_id = ANY($1) AND account_id = ANY($2)",
    )
    .bind(&status_ids[..])
    .bind(&account_ids[..])
    .fetch_all(db.inner())
    .await?;

    let mut existing: HashSet<(i64, i64)> = HashSet::with_capacity(existing_rows.len());
    for row in &existing_rows {
        existing.insert((row.try_get("status_id")?, row.try_get("account_id")?));
    }

    let now = Utc::now();
    let (updates, inserts): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|row| existing.contains(&(row.status_id, row.account_id)));

    for row in &updates {
        sqlx::query(
            "UPDATE aggregates SET aggregate = $1, updated_at = $2 WHERE status_id = $3 AND account_id = $4",
        )
        .bind(&row.aggregate)
        .bind(now)
        .bind(row.status_id)
        .bind(row.account_id)
        .execute(db.inner())
        .await?;
    }

    if inserts.is_empty() {
        debug!(updated = updates.len(), "No aggregates to insert");
        return Ok(());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO aggregates (status_id, account_id, aggregate, created_at, updated_at) ",
    );
    builder.push_values(inserts.iter(), |mut values, row| {
        values
            .push_bind(row.status_id)
            .push_bind(row.account_id)
            .push_bind(&row.aggregate)
            .push_bind(now)
            .push_bind(now);
    });
    builder.build().execute(db.inner()).await?;

    debug!(
        updated = updates.len(),
        inserted = inserts.len(),
        "Aggregates upserted"
    );
    Ok(())
}
