use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tracing::info;

const ANALYSIS_JOBS_MIGRATION: &str = include_str!("../migrations/0001_analysis_jobs.sql");

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the `analysis_jobs` table when missing. Idempotent.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    pool.execute(ANALYSIS_JOBS_MIGRATION)
        .await
        .context("Failed to apply analysis_jobs migration")?;
    info!("Database schema is up to date");
    Ok(())
}
