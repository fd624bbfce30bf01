//! Database connection management.
//!
//! Builds an `SQLx` SQLite pool configured for concurrent writers:
//! WAL journaling, enforced foreign keys, and a busy timeout so a
//! second writer waits for the lock instead of failing immediately.

use crate::error::{Result, StorageError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

/// Open a connection pool at `path` (or `:memory:` for tests).
///
/// # Errors
/// Returns `StorageError::Open` if the file cannot be created or the
/// connection options are invalid.
pub async fn connect(path: impl AsRef<Path>, max_connections: u32) -> Result<Pool<Sqlite>> {
    let path_str = path
        .as_ref()
        .to_str()
        .ok_or_else(|| StorageError::Open("invalid database path: not valid UTF-8".to_string()))?;

    let connect_options = SqliteConnectOptions::from_str(path_str)
        .map_err(|e| StorageError::Open(format!("invalid connection string: {e}")))?
        .pragma("journal_mode", "WAL")
        .pragma("foreign_keys", "ON")
        .pragma("busy_timeout", "5000")
        .create_if_missing(true);

    // A pool of :memory: connections would each open a private
    // database; tests need a single shared connection.
    let max_connections = if path_str == ":memory:" {
        1
    } else {
        max_connections
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_options)
        .await
        .map_err(|e| StorageError::Open(format!("failed to initialize pool: {e}")))?;

    tracing::info!("database pool created at {}", path_str);

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_creation_in_memory() {
        let pool = connect(":memory:", 5).await.expect("create pool");

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .expect("run trivial query");
    }

    #[tokio::test]
    async fn test_pool_creation_on_disk() {
        let tmp = tempfile::TempDir::new().expect("create temp dir");
        let db_path = tmp.path().join("docket.db");

        let pool = connect(&db_path, 2).await.expect("create pool");
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .expect("run trivial query");

        assert!(db_path.exists());
    }
}
