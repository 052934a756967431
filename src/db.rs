//! Database connection and schema management.
//!
//! This module provides SQLite database connectivity with:
//! - Connection pool management behind an explicitly owned handle
//! - WAL mode for concurrent reads
//! - Automatic migration execution
//! - Self-healing query execution: a failed query discards the pool,
//!   reconnects, and retries exactly once
//!
//! # Example
//!
//! ```no_run
//! use filhaal_core::{Database, DatabaseOptions};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(Path::new("filhaal.db"), DatabaseOptions::default()).await?;
//! let one: (i64,) = db
//!     .run(|pool| async move { sqlx::query_as("SELECT 1").fetch_one(&pool).await })
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Default maximum number of connections in the pool.
/// Kept low for SQLite since it uses file-level locking.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in milliseconds.
/// Connections will wait this long before returning SQLITE_BUSY.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DbError {
    /// Failed to connect to the database.
    #[error("failed to connect to database: {0}")]
    Connection(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Pool tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct DatabaseOptions {
    /// Maximum pooled connections.
    pub max_connections: u32,
    /// Busy timeout applied to every connection.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// Structured classification for database failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// `SQLite` returned busy/locked under concurrent access.
    BusyOrLocked,
    /// Constraint failure (unique/foreign-key/check/not-null).
    ConstraintViolation,
    /// Connection pool timed out waiting for a free connection.
    PoolTimeout,
    /// Connection pool is closed.
    PoolClosed,
    /// Expected row was not found.
    RowNotFound,
    /// Row could not be decoded into the requested type.
    Decode,
    /// Filesystem or transport IO failure.
    Io,
    /// SQL protocol/driver error.
    Protocol,
    /// Unclassified database failure.
    Other,
}

impl DbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::PoolTimeout,
            sqlx::Error::PoolClosed => Self::PoolClosed,
            sqlx::Error::RowNotFound => Self::RowNotFound,
            sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::Decode(_) => Self::Decode,
            sqlx::Error::Io(_) => Self::Io,
            sqlx::Error::Protocol(_) => Self::Protocol,
            sqlx::Error::Database(database_error) => {
                classify_database_error(database_error.as_ref())
            }
            _ => Self::Other,
        }
    }

    /// Returns true when reconnecting could plausibly change the outcome.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            Self::ConstraintViolation | Self::RowNotFound | Self::Decode
        )
    }
}

impl fmt::Display for DbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BusyOrLocked => "busy_or_locked",
            Self::ConstraintViolation => "constraint_violation",
            Self::PoolTimeout => "pool_timeout",
            Self::PoolClosed => "pool_closed",
            Self::RowNotFound => "row_not_found",
            Self::Decode => "decode",
            Self::Io => "io",
            Self::Protocol => "protocol",
            Self::Other => "other",
        };
        write!(f, "{label}")
    }
}

fn classify_database_error(
    database_error: &(dyn sqlx::error::DatabaseError + 'static),
) -> DbErrorKind {
    let code = database_error.code();
    if matches!(
        code.as_deref(),
        Some("SQLITE_BUSY" | "SQLITE_LOCKED" | "5" | "6")
    ) {
        return DbErrorKind::BusyOrLocked;
    }

    if database_error.is_unique_violation()
        || database_error.is_foreign_key_violation()
        || database_error.is_check_violation()
        || code
            .as_deref()
            .is_some_and(|value| value.starts_with("SQLITE_CONSTRAINT") || value == "2067")
    {
        return DbErrorKind::ConstraintViolation;
    }

    DbErrorKind::Other
}

#[derive(Debug)]
enum Location {
    File(PathBuf),
    Memory,
}

#[derive(Debug)]
struct DatabaseInner {
    pool: RwLock<SqlitePool>,
    location: Location,
    options: DatabaseOptions,
    recreations: AtomicU64,
    /// Serializes pool swaps.
    recreate_lock: Mutex<()>,
}

/// Database handle with a self-healing connection pool.
///
/// Clones share the same pool slot, so a pool recreated by one clone is
/// picked up by every other holder.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Creates a new database connection to the specified path.
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Enable WAL mode for concurrent reads
    /// 3. Run any pending migrations
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the connection fails,
    /// or `DbError::Migration` if migrations fail.
    #[instrument(skip(db_path, options), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path, options: DatabaseOptions) -> Result<Self, DbError> {
        let pool = connect_file(db_path, options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("database ready");

        Ok(Self::from_pool(
            pool,
            Location::File(db_path.to_path_buf()),
            options,
        ))
    }

    /// Creates an in-memory database for testing.
    ///
    /// The database exists only for the lifetime of its single connection,
    /// so the pool never expires it. WAL mode is not enabled for in-memory
    /// databases as it provides no benefit.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the connection fails,
    /// or `DbError::Migration` if migrations fail.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self::from_pool(
            pool,
            Location::Memory,
            DatabaseOptions {
                max_connections: 1,
                ..DatabaseOptions::default()
            },
        ))
    }

    fn from_pool(pool: SqlitePool, location: Location, options: DatabaseOptions) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                pool: RwLock::new(pool),
                location,
                options,
                recreations: AtomicU64::new(0),
                recreate_lock: Mutex::new(()),
            }),
        }
    }

    /// Returns the current connection pool.
    ///
    /// Prefer [`run`](Self::run) so failures get the reconnect-and-retry
    /// treatment.
    #[must_use]
    pub fn pool(&self) -> SqlitePool {
        self.inner
            .pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of times the pool has been discarded and reopened.
    #[must_use]
    pub fn recreation_count(&self) -> u64 {
        self.inner.recreations.load(Ordering::Acquire)
    }

    /// Runs a query closure against the pool.
    ///
    /// When the first attempt fails with a retryable error, the pool is
    /// recreated (file-backed databases only) and the closure runs exactly
    /// once more. The second failure is returned as-is; callers must not
    /// add retries of their own. Concurrent failures on the same pool
    /// trigger a single recreation.
    ///
    /// # Errors
    ///
    /// Returns the underlying `sqlx::Error` when the query fails twice, fails
    /// with a non-retryable error, or the pool cannot be reopened.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, sqlx::Error>
    where
        F: Fn(SqlitePool) -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let generation = self.recreation_count();
        match op(self.pool()).await {
            Ok(value) => Ok(value),
            Err(error) => {
                let kind = DbErrorKind::from_sqlx(&error);
                if !kind.is_retryable() {
                    return Err(error);
                }
                warn!(error = %error, kind = %kind, "query failed; recreating pool and retrying once");
                self.recreate_pool(generation).await?;
                op(self.pool()).await
            }
        }
    }

    /// Swaps in a fresh pool unless one newer than `generation` is already
    /// installed.
    async fn recreate_pool(&self, generation: u64) -> Result<(), sqlx::Error> {
        let Location::File(path) = &self.inner.location else {
            debug!("in-memory database keeps its pool; retrying on the same connection");
            return Ok(());
        };

        let _guard = self.inner.recreate_lock.lock().await;
        if self.recreation_count() != generation {
            debug!(generation, "pool already recreated by another caller");
            return Ok(());
        }

        let fresh = connect_file(path, self.inner.options).await?;
        let stale = {
            let mut guard = self
                .inner
                .pool
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, fresh)
        };
        self.inner.recreations.fetch_add(1, Ordering::Release);
        info!(path = %path.display(), "database pool recreated");

        tokio::spawn(async move { stale.close().await });
        Ok(())
    }

    /// Checks if WAL mode is enabled.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Connection` if the query fails.
    #[instrument(skip(self))]
    pub async fn is_wal_enabled(&self) -> Result<bool, DbError> {
        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&self.pool())
            .await?;

        Ok(result.0.eq_ignore_ascii_case("wal"))
    }

    /// Gracefully closes all connections in the pool.
    ///
    /// This should be called before the application exits to ensure
    /// all connections are properly closed.
    #[instrument(skip(self))]
    pub async fn close(&self) {
        self.pool().close().await;
    }
}

async fn connect_file(path: &Path, options: DatabaseOptions) -> Result<SqlitePool, sqlx::Error> {
    let connect_options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(u64::from(options.busy_timeout_ms)));

    SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(connect_options)
        .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn select_one(db: &Database) -> Result<i64, sqlx::Error> {
        let row: (i64,) = db
            .run(|pool| async move { sqlx::query_as("SELECT 1").fetch_one(&pool).await })
            .await?;
        Ok(row.0)
    }

    #[tokio::test]
    async fn test_database_new_in_memory_succeeds() {
        let db = Database::new_in_memory().await;
        assert!(db.is_ok(), "Failed to create in-memory database");
    }

    #[tokio::test]
    async fn test_database_migrations_create_debates_table() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO debates (name, pdf_url, storage_id, created_by, created_at) \
             VALUES ('x', 'https://res.cloudinary.com/a.pdf', 'debates/a', 'u1', '2025-01-01T00:00:00Z')",
        )
        .execute(&db.pool())
        .await;

        assert!(result.is_ok(), "debates table should exist after migration");
    }

    #[tokio::test]
    async fn test_database_issue_month_check_constraint() {
        let db = Database::new_in_memory().await.unwrap();

        let result = sqlx::query(
            "INSERT INTO issues (year, month, title, pdf_url, pdf_public_id, created_by, created_at, updated_at) \
             VALUES (2024, 13, 't', 'u', 'p', 'u1', 'now', 'now')",
        )
        .execute(&db.pool())
        .await;

        let error = result.unwrap_err();
        assert_eq!(
            DbErrorKind::from_sqlx(&error),
            DbErrorKind::ConstraintViolation
        );
    }

    #[tokio::test]
    async fn test_database_with_tempfile_enables_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::new(&db_path, DatabaseOptions::default())
            .await
            .unwrap();
        assert!(db.is_wal_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn test_run_recreates_closed_file_pool_and_retries_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("heal.db");
        let db = Database::new(&db_path, DatabaseOptions::default())
            .await
            .unwrap();

        db.pool().close().await;

        assert_eq!(select_one(&db).await.unwrap(), 1);
        assert_eq!(db.recreation_count(), 1);
    }

    #[tokio::test]
    async fn test_run_shares_recreated_pool_across_clones() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("clones.db");
        let db = Database::new(&db_path, DatabaseOptions::default())
            .await
            .unwrap();
        let other = db.clone();

        db.pool().close().await;
        select_one(&db).await.unwrap();

        assert!(!other.pool().is_closed());
        assert_eq!(other.recreation_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_recreation_swaps_pool_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("race.db");
        let db = Database::new(&db_path, DatabaseOptions::default())
            .await
            .unwrap();
        let seen = db.recreation_count();

        let (first, second) = tokio::join!(db.recreate_pool(seen), db.recreate_pool(seen));
        first.unwrap();
        second.unwrap();
        assert_eq!(db.recreation_count(), 1);

        let installed = db.pool();
        db.recreate_pool(seen).await.unwrap();
        assert_eq!(db.recreation_count(), 1);
        assert!(!installed.is_closed(), "stale generation must not replace the fresh pool");
    }

    #[tokio::test]
    async fn test_run_does_not_retry_constraint_violations() {
        let db = Database::new_in_memory().await.unwrap();
        let attempts = AtomicU64::new(0);

        let result = db
            .run(|pool| {
                attempts.fetch_add(1, Ordering::Relaxed);
                async move {
                    sqlx::query("INSERT INTO categories (name, slug) VALUES ('a', 'a'), ('b', 'a')")
                        .execute(&pool)
                        .await
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_run_retries_exactly_once_then_surfaces_failure() {
        let db = Database::new_in_memory().await.unwrap();
        let attempts = AtomicU64::new(0);

        let result: Result<(), sqlx::Error> = db
            .run(|_pool| {
                attempts.fetch_add(1, Ordering::Relaxed);
                async move { Err(sqlx::Error::PoolTimedOut) }
            })
            .await;

        assert!(matches!(result, Err(sqlx::Error::PoolTimedOut)));
        assert_eq!(attempts.load(Ordering::Relaxed), 2);
        assert_eq!(db.recreation_count(), 0, "in-memory pools are never swapped");
    }

    #[test]
    fn test_error_kind_retryable_classes() {
        assert!(DbErrorKind::PoolClosed.is_retryable());
        assert!(DbErrorKind::Io.is_retryable());
        assert!(!DbErrorKind::ConstraintViolation.is_retryable());
        assert!(!DbErrorKind::RowNotFound.is_retryable());
        assert_eq!(DbErrorKind::BusyOrLocked.to_string(), "busy_or_locked");
    }
}
