//! Database layer for fedirank
//!
//! Provides connection pool management over the Mastodon-compatible
//! relational store. All data access in the engine is raw parameterized
//! SQL; there is no entity layer.

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    pool: PgPool,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        info!(
            host = %config.db_host,
            port = config.db_port,
            database = %config.db_name,
            "Connecting to database..."
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout_secs))
            .connect(&config.database_url())
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// Access the underlying pool for queries
    pub fn inner(&self) -> &PgPool {
        &self.pool
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;
        Ok(())
    }
}
