//! SQLite connection pool and schema management.
//!
//! The pool backs both the record store ([`crate::store::SqliteNovelStore`])
//! and the rule store ([`crate::rules::RuleStore`]):
//! - WAL journal for file-backed databases
//! - busy timeout so concurrent writers wait instead of failing
//! - embedded migrations run on open
//!
//! # Example
//!
//! ```no_run
//! use novel_importer::Database;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("library.db")).await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

/// Pool size for file-backed libraries. SQLite serializes writers anyway.
const LIBRARY_POOL_SIZE: u32 = 5;

/// SQLite busy timeout.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Failures opening or migrating the library.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("library database unavailable: {0}")]
    Connection(#[from] sqlx::Error),

    /// The schema could not be brought up to date.
    #[error("library schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Shared handle to the library database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database at `db_path` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// [`DbError::Connection`] when the file cannot be opened and
    /// [`DbError::Migration`] when the schema cannot be applied.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(LIBRARY_POOL_SIZE)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!("database ready");

        Ok(Self { pool })
    }

    /// Opens a private in-memory library, used by tests.
    ///
    /// Limited to one connection since each in-memory connection is its own database.
    ///
    /// # Errors
    ///
    /// As [`Database::new`].
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// The pool, for running queries.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Whether the journal is in WAL mode.
    ///
    /// # Errors
    ///
    /// [`DbError::Connection`] if the pragma query fails.
    #[instrument(skip(self))]
    pub async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool)
            .await?;

        Ok(mode.eq_ignore_ascii_case("wal"))
    }

    /// Waits for open connections to finish and closes them.
    #[instrument(skip(self))]
    pub async fn close(self) {
        self.pool.close().await;
    }
}
