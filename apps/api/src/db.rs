use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::Config;

/// Opens the PostgreSQL pool and brings the schema up to date.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    info!(
        max_connections = config.db_max_connections,
        "Connecting to PostgreSQL..."
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await
        .context("PostgreSQL is unreachable")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to apply migrations")?;

    info!("PostgreSQL pool ready, migrations applied");
    Ok(pool)
}
