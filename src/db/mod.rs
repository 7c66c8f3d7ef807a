mod models;
mod seeders;

pub use models::*;
pub use seeders::seed_categories;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub type DbPool = SqlitePool;

/// Startup connect attempts before the process gives up. Covers container
/// orchestration bringing the database volume up after the service.
const CONNECT_ATTEMPTS: u32 = 10;
const CONNECT_BACKOFF: Duration = Duration::from_secs(2);

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("tradepost.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = connect_with_retry(&db_url).await?;

    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    // Seed the default taxonomy (no-op once categories exist)
    seeders::seed_categories(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

async fn connect_with_retry(db_url: &str) -> Result<DbPool> {
    let mut attempt = 1;
    loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                warn!(
                    "Database connection attempt {}/{} failed: {}",
                    attempt, CONNECT_ATTEMPTS, e
                );
                tokio::time::sleep(CONNECT_BACKOFF).await;
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Initial schema
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    info!("Migrations completed");
    Ok(())
}
