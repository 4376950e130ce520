//! Core models shared across the fedirank services

mod account;
mod candidate;
mod status;

pub use account::Account;
pub use candidate::Candidate;
pub use status::{Status, Tag};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A candidate together with the full feature map computed for it.
/// Produced once per candidate per request and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedCandidate {
    pub candidate: Candidate,
    pub aggregates: HashMap<String, i64>,
}

/// A candidate together with its final rank. The rank is written once by
/// the scorer and adjusted at most once by the author down-ranker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    pub rank: f32,
}
