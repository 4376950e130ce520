//! Aggregation and ranking handlers
//!
//! Both endpoints take a JSON list of candidates. `/get_aggregates`
//! returns the raw feature maps; `/get_rankings` also persists them and
//! returns the scored, author-diversity-adjusted list.
//!
//! The batch cap is the sole throttle on per-request fan-out. A database
//! that is unreachable at request start is a 503; a single failed
//! upstream fetch is not an error at all (the affected features read
//! zero).

use crate::AppState;
use axum::{extract::State, Json};
use fedirank_common::errors::{AppError, Result};
use fedirank_common::metrics::RequestMetrics;
use fedirank_common::models::{AggregatedCandidate, Candidate, RankedCandidate};
use tracing::info;

/// Compute the feature map for each candidate in the batch
pub async fn get_aggregates(
    State(state): State<AppState>,
    Json(candidates): Json<Vec<Candidate>>,
) -> Result<Json<Vec<AggregatedCandidate>>> {
    let request_metrics = RequestMetrics::start("/get_aggregates");
    validate_batch(&state, &candidates)?;

    // Fail fast with 503 when the store is unreachable; every SQL-backed
    // source would otherwise degrade to zero and mask the outage.
    state.db.ping().await?;

    let aggregated = state.engine.aggregate(&candidates).await?;

    info!(batch = candidates.len(), "Aggregates computed");
    request_metrics.finish(200, candidates.len());
    Ok(Json(aggregated))
}

/// Rank the batch: aggregate, persist, score, down-rank
pub async fn get_rankings(
    State(state): State<AppState>,
    Json(candidates): Json<Vec<Candidate>>,
) -> Result<Json<Vec<RankedCandidate>>> {
    let request_metrics = RequestMetrics::start("/get_rankings");
    validate_batch(&state, &candidates)?;

    state.db.ping().await?;

    let aggregated = state.engine.aggregate(&candidates).await?;
    state.engine.persist_aggregates(&aggregated).await?;
    let ranked = state.engine.rank_aggregated(&aggregated);

    info!(batch = candidates.len(), "Rankings computed and persisted");
    request_metrics.finish(200, candidates.len());
    Ok(Json(ranked))
}

fn validate_batch(state: &AppState, candidates: &[Candidate]) -> Result<()> {
    if candidates.len() > state.config.max_batch_size {
        return Err(AppError::Validation {
            message: format!(
                "batch of {} exceeds the {} candidate cap",
                candidates.len(),
                state.config.max_batch_size
            ),
            field: Some("candidates".to_string()),
        });
    }
    Ok(())
}
