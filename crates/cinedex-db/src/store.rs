//! The library store seam.
//!
//! The scanner reads the library once at scan start through
//! [`LibraryStore::snapshot`] and writes everything back inside a single
//! [`LibraryStore::transaction`]. Writes made through the [`LibraryWriter`]
//! handed to the transaction closure become visible together or not at all.

use std::collections::BTreeMap;

use cinedex_common::Result;
use rusqlite::Connection;

use crate::db_err;
use crate::models::{FileOwner, LibrarySnapshot, Movie, Show, VideoFile};
use crate::pool::{get_conn, DbPool};
use crate::queries::{movies, shows, unscanned, video_files};

/// Write operations available inside a store transaction.
pub trait LibraryWriter {
    /// Insert or update a movie together with its files.
    fn save_movie(&mut self, movie: &Movie) -> Result<()>;

    /// Insert or update a show with all its seasons, episodes and files.
    fn save_show(&mut self, show: &Show) -> Result<()>;

    /// Replace the persisted list of unidentified files.
    fn set_unscanned_files(&mut self, files: &[VideoFile]) -> Result<()>;

    /// Delete movies without files. Returns how many were deleted.
    fn delete_empty_movies(&mut self) -> Result<usize>;

    /// Delete episodes without files, then seasons without episodes, then
    /// shows without seasons. Returns how many shows were deleted.
    fn delete_empty_shows(&mut self) -> Result<usize>;
}

/// Persistent storage for the scanned library.
pub trait LibraryStore: Send + Sync {
    /// Load every movie and show with their files.
    fn snapshot(&self) -> Result<LibrarySnapshot>;

    /// Files the last scan could not identify.
    fn unscanned_files(&self) -> Result<Vec<VideoFile>>;

    fn clear_unscanned_files(&self) -> Result<()>;

    /// Run `f` in one atomic transaction.
    ///
    /// The transaction commits only when `f` returns `Ok`; any error rolls
    /// back every write made through the writer.
    fn transaction(&self, f: &mut dyn FnMut(&mut dyn LibraryWriter) -> Result<()>) -> Result<()>;
}

/// SQLite implementation of [`LibraryStore`].
#[derive(Clone)]
pub struct SqliteLibraryStore {
    pool: DbPool,
}

impl SqliteLibraryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

struct SqliteWriter<'a> {
    conn: &'a Connection,
}

impl LibraryWriter for SqliteWriter<'_> {
    fn save_movie(&mut self, movie: &Movie) -> Result<()> {
        movies::upsert_movie(self.conn, movie)
    }

    fn save_show(&mut self, show: &Show) -> Result<()> {
        shows::upsert_show(self.conn, show)
    }

    fn set_unscanned_files(&mut self, files: &[VideoFile]) -> Result<()> {
        unscanned::replace_unscanned(self.conn, files)
    }

    fn delete_empty_movies(&mut self) -> Result<usize> {
        movies::delete_empty_movies(self.conn)
    }

    fn delete_empty_shows(&mut self) -> Result<usize> {
        shows::delete_empty_shows(self.conn)
    }
}

impl LibraryStore for SqliteLibraryStore {
    fn snapshot(&self) -> Result<LibrarySnapshot> {
        let conn = get_conn(&self.pool)?;

        let mut movies: BTreeMap<_, _> = movies::list_movies(&conn)?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();
        let mut shows: BTreeMap<_, _> = shows::list_shows(&conn)?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        for (owner, file) in video_files::list_files(&conn)? {
            match owner {
                FileOwner::Movie(id) => {
                    if let Some(movie) = movies.get_mut(&id) {
                        movie.files.push(file);
                    }
                }
                FileOwner::Episode {
                    show_id,
                    season,
                    episode,
                } => {
                    if let Some(ep) = shows
                        .get_mut(&show_id)
                        .and_then(|s| s.episode_mut(season, episode))
                    {
                        ep.files.push(file);
                    }
                }
            }
        }

        Ok(LibrarySnapshot { movies, shows })
    }

    fn unscanned_files(&self) -> Result<Vec<VideoFile>> {
        let conn = get_conn(&self.pool)?;
        unscanned::list_unscanned(&conn)
    }

    fn clear_unscanned_files(&self) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        unscanned::clear_unscanned(&conn)?;
        Ok(())
    }

    fn transaction(&self, f: &mut dyn FnMut(&mut dyn LibraryWriter) -> Result<()>) -> Result<()> {
        let mut conn = get_conn(&self.pool)?;
        let tx = conn.transaction().map_err(db_err)?;

        let mut writer = SqliteWriter { conn: &tx };
        f(&mut writer)?;

        tx.commit().map_err(db_err)
    }
}
