/// Database layer
///
/// Owns SQLite pool construction and schema migrations. All managers share
/// one pool handed out by the application context.

pub mod models;

use crate::config::DatabaseConfig;
use crate::error::{ApiError, ApiResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Create a SQLite connection pool
pub async fn create_pool(config: &DatabaseConfig) -> ApiResult<SqlitePool> {
    let path = &config.path;

    // Ensure parent directory exists for file-backed databases
    if path.as_os_str() != ":memory:" {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(ApiError::Database)?;

    Ok(pool)
}

/// Run migrations, embedded at compile time from ./migrations
pub async fn run_migrations(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| ApiError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> ApiResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(ApiError::Database)?;

    Ok(())
}

/// In-memory pool with the full schema applied. A single connection keeps
/// every statement on the same in-memory database.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("failed to open in-memory database");
    run_migrations(&pool).await.expect("failed to run migrations");
    pool
}
