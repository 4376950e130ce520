//! Health and readiness probes
//!
//! Readiness tracks the store alone: the ranking endpoints answer 503
//! without it, while the federation and embedding upstreams degrade
//! per-source and are not probed.

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use fedirank_common::VERSION;
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub store: StoreCheck,
}

/// State of the relational store the aggregation engine reads from and
/// persists aggregates into
#[derive(Serialize)]
pub struct StoreCheck {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: VERSION,
    })
}

/// Readiness probe; answers 503 while the store is unreachable.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();

    let store = match state.db.ping().await {
        Ok(()) => StoreCheck {
            reachable: true,
            ping_ms: Some(started.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => StoreCheck {
            reachable: false,
            ping_ms: None,
            error: Some(e.to_string()),
        },
    };

    let code = if store.reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(ReadyResponse {
            ready: store.reachable,
            store,
        }),
    )
}
