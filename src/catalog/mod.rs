//! Metadata catalog access.
//!
//! # Module layout
//!
//! - [`provider`] -- The [`CatalogProvider`] trait, its error type and the
//!   typed metadata it returns.
//! - [`providers`] -- Concrete providers (TMDB).
//! - [`gateway`] -- [`CatalogGateway`], the throttled front door every scan
//!   task goes through.

pub mod gateway;
pub mod provider;
pub mod providers;

pub use gateway::{CatalogGateway, GatewaySettings};
pub use provider::{
    CatalogError, CatalogProvider, CatalogResult, EpisodeMetadata, MovieMetadata,
    SearchCandidate, SeasonMetadata, ShowMetadata,
};
pub use providers::TmdbCatalog;
