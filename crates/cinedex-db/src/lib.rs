//! Cinedex-DB: library persistence.
//!
//! This crate stores the scanned media library in SQLite using rusqlite and
//! r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Movie, show, season, episode and video file models
//! - `queries` - Database query operations
//! - `store` - The [`LibraryStore`](store::LibraryStore) seam used by the
//!   scanner, with its transactional SQLite implementation
//!
//! # Example
//!
//! ```no_run
//! use cinedex_db::pool::init_pool;
//! use cinedex_db::store::{LibraryStore, SqliteLibraryStore};
//!
//! let pool = init_pool("/var/lib/cinedex/library.sqlite").unwrap();
//! let store = SqliteLibraryStore::new(pool);
//!
//! let library = store.snapshot().unwrap();
//! println!("{} movies, {} shows", library.movies.len(), library.shows.len());
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod store;

/// Convert a rusqlite error into the common error type.
pub(crate) fn db_err(err: rusqlite::Error) -> cinedex_common::Error {
    cinedex_common::Error::database(err.to_string())
}
