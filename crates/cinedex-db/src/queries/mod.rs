//! Database query modules.
//!
//! This module organizes all database operations into logical groups:
//! - movies: Movie rows and empty-movie cleanup
//! - shows: Show, season and episode rows and empty-show cleanup
//! - video_files: Files attached to movies and episodes
//! - unscanned: Files that could not be identified
//! - ratings: Imported external ratings

pub mod movies;
pub mod ratings;
pub mod shows;
pub mod unscanned;
pub mod video_files;

use rusqlite::types::Type;
use uuid::Uuid;

/// Parse a UUID stored as TEXT in column `idx`.
pub(crate) fn parse_uuid(idx: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decode a JSON string list column, treating malformed data as empty.
pub(crate) fn parse_string_list(value: &str) -> Vec<String> {
    serde_json::from_str(value).unwrap_or_default()
}
