//! Concrete catalog providers.

pub mod tmdb;

pub use tmdb::TmdbCatalog;
