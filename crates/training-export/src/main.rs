//! Fedirank Training Export
//!
//! Joins the persisted aggregates against the interactions that actually
//! followed (did the viewer like or reblog the status?) and writes the
//! labelled feature maps to `training_data.json` for offline weight
//! fitting. Fitting itself happens elsewhere.

use fedirank_common::{config::AppConfig, db::DbPool, VERSION};
use serde::Serialize;
use sqlx::Row;
use tracing::{info, Level};

const OUTPUT_PATH: &str = "training_data.json";

/// One labelled example: the feature map that was served and the
/// engagement observed afterwards
#[derive(Debug, Serialize)]
struct TrainingPoint {
    aggregates: serde_json::Value,
    results: TrainingResults,
}

#[derive(Debug, Serialize)]
struct TrainingResults {
    liked: bool,
    rebloged: bool,
}

const TRAINING_DATA_SQL: &str = r#"
SELECT aggregates.aggregate,
       favourites.id IS NOT NULL AS liked,
       reblog.id IS NOT NULL AS rebloged
FROM aggregates
LEFT JOIN favourites
    ON favourites.status_id = aggregates.status_id
   AND favourites.account_id = aggregates.account_id
LEFT JOIN statuses reblog
    ON reblog.reblog_of_id = aggregates.status_id
   AND reblog.account_id = aggregates.account_id
"#;

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

    info!("Starting fedirank training export v{}", VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    // Initialize database connection
    let db = DbPool::connect(&config).await?;

    let rows = sqlx::query(TRAINING_DATA_SQL)
        .fetch_all(db.inner())
        .await?;

    let mut training_points = Vec::with_capacity(rows.len());
    for row in &rows {
        training_points.push(TrainingPoint {
            aggregates: row.try_get("aggregate")?,
            results: TrainingResults {
                liked: row.try_get("liked")?,
                rebloged: row.try_get("rebloged")?,
            },
        });
    }

    let json = serde_json::to_string_pretty(&training_points)?;
    tokio::fs::write(OUTPUT_PATH, json).await?;

    info!(
        points = training_points.len(),
        path = OUTPUT_PATH,
        "Training data written"
    );
    Ok(())
}
