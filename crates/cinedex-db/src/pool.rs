//! Database connection pool management.
//!
//! This module provides connection pooling for SQLite using r2d2.
//! It handles pool initialization, connection customization, and running migrations.

use std::time::Duration;

use cinedex_common::{Error, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::migrations;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Initialize a new database pool with the given file path.
///
/// This function will:
/// - Create the SQLite database file if it doesn't exist
/// - Enable foreign key constraints and a busy timeout on all connections
/// - Run pending database migrations
///
/// # Example
///
/// ```no_run
/// use cinedex_db::pool::init_pool;
///
/// let pool = init_pool("/var/lib/cinedex/library.sqlite").unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        // Enable foreign key constraints on each new connection
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)
    });

    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    migrate(&pool)?;
    Ok(pool)
}

/// Initialize an in-memory database pool for testing.
///
/// Every SQLite in-memory connection is its own database, so the pool holds a
/// single connection. The database is lost when the pool is dropped.
///
/// # Example
///
/// ```
/// use cinedex_db::pool::init_memory_pool;
///
/// let pool = init_memory_pool().unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create in-memory pool: {}", e)))?;

    migrate(&pool)?;
    Ok(pool)
}

/// Get a connection from the pool.
///
/// This is a convenience wrapper around `pool.get()` that converts the
/// r2d2 error into our common Error type.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {}", e)))
}

fn migrate(pool: &DbPool) -> Result<()> {
    let conn = get_conn(pool)?;
    migrations::run_migrations(&conn)
        .map_err(|e| Error::database(format!("Failed to run migrations: {}", e)))?;
    Ok(())
}
