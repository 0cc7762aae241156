//! Connection pool setup.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::error::{DbError, DbResult};

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Postgres connection URL
    pub database_url: String,
    /// Maximum pool connections
    pub max_connections: u32,
    /// Connection acquire timeout
    pub acquire_timeout: Duration,
}

impl DbConfig {
    /// Create config from environment variables.
    pub fn from_env() -> DbResult<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| DbError::config_error("DATABASE_URL not set"))?,
            max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            acquire_timeout: Duration::from_secs(
                std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        })
    }
}

/// Connect a pool from configuration.
pub async fn connect(config: &DbConfig) -> DbResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await?;

    info!("Connected to Postgres (max_connections={})", config.max_connections);
    Ok(pool)
}

/// Connect from environment variables.
pub async fn connect_from_env() -> DbResult<PgPool> {
    let config = DbConfig::from_env()?;
    connect(&config).await
}

/// Run embedded migrations.
pub async fn migrate(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
