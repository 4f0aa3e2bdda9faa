//! Connection pool shared by persona records and avatar storage.
//!
//! Avatar reads are the heaviest consumer: one request checks out a
//! connection per chunk, all at once. The pool size caps how many of those
//! reads run in parallel and the checkout timeout bounds how long the rest
//! queue behind them.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::time::Duration;
use thiserror::Error;

/// Runtime tunables for SQLite connection behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections, and so of concurrent chunk reads.
    pub pool_max_size: u32,

    /// How long a caller waits for a free pooled connection, in milliseconds.
    /// Keep it at or below the avatar per-chunk budget so a starved fan-out
    /// fails as a timeout rather than hanging past it.
    pub checkout_timeout_ms: u64,
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
            checkout_timeout_ms: 5_000,
        }
    }
}

/// A type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Errors that can occur when creating the database pool.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("failed to create database connection pool: {0}")]
    PoolInit(#[from] r2d2::Error),

    #[error("failed to inspect database: {0}")]
    Inspect(#[from] rusqlite::Error),

    /// The file refused write-ahead logging, which concurrent chunk reads
    /// alongside uploads depend on.
    #[error("database is in {0} journal mode, expected wal")]
    NotWal(String),
}

/// Pragmas applied to every new connection.
fn configure(conn: &mut Connection, busy_timeout_ms: u64) -> rusqlite::Result<()> {
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(Duration::from_millis(busy_timeout_ms))
}

/// Creates the SQLite pool for `db_path`.
///
/// Every pooled connection opens the same file, so tests that exercise more
/// than one connection should point `db_path` at a temporary file rather than
/// `:memory:`.
///
/// # Errors
///
/// Returns `PoolError` if the pool cannot be built or the database does not
/// accept WAL mode.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

    let busy_timeout_ms = settings.busy_timeout_ms;
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(flags)
        .with_init(move |conn| configure(conn, busy_timeout_ms));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .connection_timeout(Duration::from_millis(settings.checkout_timeout_ms))
        .build(manager)?;

    // In-memory databases report "memory" and are accepted.
    let mode: String = pool
        .get()?
        .pragma_query_value(None, "journal_mode", |row| row.get(0))?;
    if mode != "wal" && mode != "memory" {
        return Err(PoolError::NotWal(mode));
    }

    tracing::debug!(
        path = db_path,
        max_size = settings.pool_max_size,
        checkout_timeout_ms = settings.checkout_timeout_ms,
        "database pool ready"
    );
    Ok(pool)
}
