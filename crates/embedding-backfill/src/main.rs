//! Fedirank Embedding Backfill
//!
//! Offline job that warms the embedding store: every status a local user
//! has liked or reblogged is run through the embedding cache's bulk
//! path, so the ranking service finds persisted vectors instead of
//! calling the remote service at request time.

mod processor;

use crate::processor::Backfill;
use fedirank_common::{config::AppConfig, db::DbPool, embeddings, VERSION};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting fedirank embedding backfill v{}", VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    // Initialize database connection
    let db = DbPool::connect(&config).await?;

    // Initialize the embedding client
    let embedder = embeddings::create_embedder(&config)?;

    let backfill = Backfill::new(db, embedder);
    backfill.run().await?;

    info!("Embedding backfill complete");
    Ok(())
}
