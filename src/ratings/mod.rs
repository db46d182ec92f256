//! External ratings.
//!
//! Ratings come from a bulk dataset keyed by IMDb id rather than from the
//! catalog. The scanner refreshes them as a best-effort step after the
//! library has been saved.

mod dataset;

pub use dataset::DatasetRatingsStore;

use std::collections::HashSet;

use async_trait::async_trait;
use cinedex_db::models::ExternalRating;
use serde::Serialize;

/// Stage of a bulk ratings refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingsStage {
    Downloading,
    Importing,
    Done,
}

impl std::fmt::Display for RatingsStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Downloading => "downloading",
            Self::Importing => "importing",
            Self::Done => "done",
        })
    }
}

/// Callback receiving bulk refresh stages.
pub type RatingsProgress<'a> = dyn Fn(RatingsStage) + Send + Sync + 'a;

/// Store of externally sourced ratings.
#[async_trait]
pub trait RatingsStore: Send + Sync {
    /// Rating for an IMDb id, if one has been imported.
    fn lookup(&self, imdb_id: &str) -> anyhow::Result<Option<ExternalRating>>;

    /// Import ratings for exactly `ids`. Returns how many were stored.
    async fn bulk_refresh(
        &self,
        ids: &HashSet<String>,
        on_progress: Option<&RatingsProgress<'_>>,
    ) -> anyhow::Result<usize>;
}
