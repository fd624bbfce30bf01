//! Docket Database Layer
//!
//! Provides `SQLite` access via `SQLx` with embedded migrations. Three
//! entities are owned here and nowhere else: search attempts (append
//! only), cases (upsert by natural key), and orders (reconciled by
//! identity within their case).
//!
//! # Example
//!
//! ```ignore
//! use docket_db::Database;
//!
//! let db = Database::new("docket.db", 5).await?;
//! db.run_migrations().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cases;
pub mod connection;
pub mod error;
pub mod migrations;
pub mod search_attempts;

// Re-export commonly used types
pub use cases::{StoredCase, StoredOrder};
pub use error::{Result, StorageError};
pub use search_attempts::{AttemptOutcome, HistoryFilter, Pagination, SearchAttempt};

use std::path::Path;

/// High-level database interface with pooling and migrations.
#[derive(Debug)]
pub struct Database {
    pool: sqlx::Pool<sqlx::Sqlite>,
}

impl Database {
    /// Open a database at the specified path.
    ///
    /// # Arguments
    /// * `path` - Path to the database file (or `:memory:` for tests)
    /// * `max_connections` - Pool size
    ///
    /// # Errors
    /// Returns `StorageError` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>, max_connections: u32) -> Result<Self> {
        let pool = connection::connect(path, max_connections).await?;
        Ok(Self { pool })
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `StorageError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    ///
    /// # Errors
    /// Returns `StorageError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("database pool closed");
    }
}
