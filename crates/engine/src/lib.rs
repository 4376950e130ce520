//! Fedirank Aggregation Engine
//!
//! The concurrent core of the ranking service. For a batch of
//! `(candidate status, viewing account)` pairs it:
//! 1. Builds six request-scoped data sources that deduplicate and share
//!    the underlying SQL and federation fetches
//! 2. Fans out one task per (feature, candidate) cell across seventeen
//!    feature extractors
//! 3. Collects the feature maps, applies the linear weight vector, and
//!    down-ranks repeated authors
//!
//! A failed fetch never fails the batch: the affected source degrades to
//! a zero payload and its dependent features contribute zero.

pub mod cache;
pub mod downrank;
pub mod extractors;
pub mod federation;
pub mod orchestrator;
pub mod scoring;
pub mod sources;
pub mod store;

pub use cache::EmbeddingCache;
pub use federation::FederationClient;
pub use orchestrator::{aggregate_candidates, score_candidates, Engine};
pub use scoring::RankingWeights;
pub use sources::{DataSources, LazySource, PreloadedSources};
