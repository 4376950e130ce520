//! Fedirank Common Library
//!
//! Shared code for the fedirank services including:
//! - Core models (candidates, statuses, accounts, aggregates)
//! - Database pool management
//! - Embedding client abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::DbPool;
pub use embeddings::Embedder;
pub use errors::{AppError, Result};
pub use models::{Account, AggregatedCandidate, Candidate, RankedCandidate, Status, Tag};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Embedding model used for status text
pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Dimension of a status text embedding. A status either carries a vector
/// of exactly this length or an empty one.
pub const EMBEDDING_DIM: usize = 1536;
