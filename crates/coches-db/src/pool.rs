//! SQLite connection pooling.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags};
use std::time::Duration;
use thiserror::Error;

/// Per-connection and pool-wide SQLite knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbRuntimeSettings {
    /// How long a connection waits on a locked database, in milliseconds.
    pub busy_timeout_ms: u64,
    /// Upper bound on open connections.
    pub pool_max_size: u32,
}

impl DbRuntimeSettings {
    fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DbRuntimeSettings {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
            pool_max_size: 8,
        }
    }
}

/// Pooled SQLite connections shared by the store.
pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("cannot open sqlite pool: {0}")]
    PoolInit(#[from] r2d2::Error),
}

/// Opens a pool over `db_path`, switching every connection to WAL.
///
/// `:memory:` gives each connection its own private database; use
/// `pool_max_size: 1` when all callers must see the same data.
///
/// # Errors
///
/// [`PoolError::PoolInit`] when the first connection cannot be opened or
/// configured.
pub fn create_pool(db_path: &str, settings: DbRuntimeSettings) -> Result<DbPool, PoolError> {
    let manager = SqliteConnectionManager::file(db_path)
        .with_flags(
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .with_init(move |conn| configure_connection(conn, settings.busy_timeout()));

    let pool = Pool::builder()
        .max_size(settings.pool_max_size)
        .build(manager)?;

    tracing::debug!(
        path = db_path,
        max_size = settings.pool_max_size,
        busy_timeout_ms = settings.busy_timeout_ms,
        "sqlite pool ready"
    );
    Ok(pool)
}

/// Runs once per new connection. In-memory databases answer `memory` to the
/// journal mode switch and are accepted as-is.
fn configure_connection(conn: &mut Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !matches!(mode.to_ascii_lowercase().as_str(), "wal" | "memory") {
        return Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
            Some(format!("journal_mode stayed {mode}, expected wal")),
        ));
    }
    conn.busy_timeout(busy_timeout)
}
