//! Trait definition and types for catalog providers.
//!
//! Catalog JSON is parsed into the structs below by each provider, so the rest
//! of the scanner only ever sees typed metadata.

use async_trait::async_trait;
use cinedex_common::{MovieId, ShowId};
use cinedex_db::models::{Episode, Movie, Season, Show};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of a catalog call.
///
/// `Clone` so a single failed fetch can be handed to every task waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog is not configured: no API key set")]
    NotConfigured,

    #[error("catalog request failed: {0}")]
    Request(String),

    #[error("catalog returned HTTP {status} for {path}")]
    Status { status: u16, path: String },

    #[error("failed to decode catalog response: {0}")]
    Decode(String),

    #[error("catalog has no entry for {0}")]
    NotFound(String),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// A single result of a movie or show search, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    /// Catalog id; a movie id for movie searches, a show id for show searches.
    pub id: u64,
    pub title: String,
    /// Release year for movies, first-air year for shows.
    pub year: Option<u16>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Details
// ---------------------------------------------------------------------------

/// Full details of a movie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub id: MovieId,
    pub title: String,
    pub original_title: Option<String>,
    pub year: Option<u16>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub logo_path: Option<String>,
    pub rating: Option<f64>,
    pub status: Option<String>,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<String>,
    pub imdb_id: Option<String>,
}

impl MovieMetadata {
    /// A new library movie without files.
    pub fn to_movie(&self) -> Movie {
        Movie {
            id: self.id,
            title: self.title.clone(),
            original_title: self.original_title.clone(),
            year: self.year,
            overview: self.overview.clone(),
            poster_path: self.poster_path.clone(),
            backdrop_path: self.backdrop_path.clone(),
            logo_path: self.logo_path.clone(),
            rating: self.rating,
            status: self.status.clone(),
            runtime_minutes: self.runtime_minutes,
            genres: self.genres.clone(),
            imdb_id: self.imdb_id.clone(),
            external_rating: None,
            files: Vec::new(),
        }
    }

    /// Overwrite the display fields of an existing movie, keeping its identity
    /// and files.
    pub fn refresh(&self, movie: &mut Movie) {
        movie.poster_path = self.poster_path.clone();
        movie.backdrop_path = self.backdrop_path.clone();
        movie.overview = self.overview.clone();
        movie.logo_path = self.logo_path.clone();
        movie.rating = self.rating;
        movie.status = self.status.clone();
        if movie.imdb_id.is_none() {
            movie.imdb_id = self.imdb_id.clone();
        }
    }
}

/// Full details of a TV show.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowMetadata {
    pub id: ShowId,
    pub title: String,
    pub original_title: Option<String>,
    pub first_air_year: Option<u16>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub logo_path: Option<String>,
    pub rating: Option<f64>,
    pub status: Option<String>,
    pub genres: Vec<String>,
    pub imdb_id: Option<String>,
    /// Season numbers the catalog knows about.
    pub season_numbers: Vec<u32>,
}

impl ShowMetadata {
    /// A new library show without seasons.
    pub fn to_show(&self) -> Show {
        Show {
            id: self.id,
            title: self.title.clone(),
            original_title: self.original_title.clone(),
            first_air_year: self.first_air_year,
            overview: self.overview.clone(),
            poster_path: self.poster_path.clone(),
            backdrop_path: self.backdrop_path.clone(),
            logo_path: self.logo_path.clone(),
            rating: self.rating,
            status: self.status.clone(),
            genres: self.genres.clone(),
            imdb_id: self.imdb_id.clone(),
            external_rating: None,
            seasons: Default::default(),
        }
    }

    /// Overwrite the display fields of an existing show, keeping its identity
    /// and seasons.
    pub fn refresh(&self, show: &mut Show) {
        show.poster_path = self.poster_path.clone();
        show.backdrop_path = self.backdrop_path.clone();
        show.overview = self.overview.clone();
        show.logo_path = self.logo_path.clone();
        show.rating = self.rating;
        show.status = self.status.clone();
        if show.imdb_id.is_none() {
            show.imdb_id = self.imdb_id.clone();
        }
    }
}

/// Details of one season with its episode list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonMetadata {
    pub show_id: ShowId,
    pub number: u32,
    pub name: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub episodes: Vec<EpisodeMetadata>,
}

/// Details of one episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    pub number: u32,
    pub name: String,
    pub overview: Option<String>,
    pub still_path: Option<String>,
    pub air_date: Option<String>,
}

impl SeasonMetadata {
    pub fn episode(&self, number: u32) -> Option<&EpisodeMetadata> {
        self.episodes.iter().find(|e| e.number == number)
    }

    /// Build an episode record from the catalog entry, or a placeholder when
    /// the catalog does not list it.
    pub fn make_episode(&self, number: u32) -> Episode {
        match self.episode(number) {
            Some(meta) => Episode {
                number,
                name: meta.name.clone(),
                overview: meta.overview.clone(),
                still_path: meta.still_path.clone(),
                air_date: meta.air_date.clone(),
                files: Vec::new(),
            },
            None => Episode::placeholder(number),
        }
    }

    /// Fill season-level fields the library does not have yet.
    pub fn fill_season(&self, season: &mut Season) {
        if season.name.is_none() {
            season.name = self.name.clone();
        }
        if season.overview.is_none() {
            season.overview = self.overview.clone();
        }
        if season.poster_path.is_none() {
            season.poster_path = self.poster_path.clone();
        }
    }

    /// Apply catalog details to a placeholder episode.
    ///
    /// Confirmed names are never replaced. Returns whether the episode changed.
    pub fn upgrade_placeholder(&self, episode: &mut Episode) -> bool {
        if !episode.has_placeholder_name() {
            return false;
        }
        match self.episode(episode.number) {
            Some(meta) if !meta.name.is_empty() && meta.name != episode.name => {
                episode.name = meta.name.clone();
                episode.overview = meta.overview.clone();
                episode.still_path = meta.still_path.clone();
                episode.air_date = meta.air_date.clone();
                true
            }
            _ => false,
        }
    }

    /// Refresh the display fields of every episode the catalog lists.
    ///
    /// Used by the full refresh pass, which does overwrite confirmed names.
    /// Returns whether anything changed.
    pub fn refresh(&self, season: &mut Season) -> bool {
        let before = season.clone();
        season.name = self.name.clone().or(season.name.take());
        season.overview = self.overview.clone().or(season.overview.take());
        season.poster_path = self.poster_path.clone().or(season.poster_path.take());
        for episode in season.episodes.values_mut() {
            if let Some(meta) = self.episode(episode.number) {
                if !meta.name.is_empty() {
                    episode.name = meta.name.clone();
                }
                episode.overview = meta.overview.clone();
                episode.still_path = meta.still_path.clone();
                episode.air_date = meta.air_date.clone();
            }
        }
        *season != before
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Async trait implemented by metadata catalogs.
///
/// Implementations only translate calls to the remote service. Throttling and
/// concurrency limits belong to [`CatalogGateway`](super::CatalogGateway).
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"tmdb"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when credentials are configured.
    fn is_available(&self) -> bool;

    /// Search movies by title, optionally constrained by release year.
    /// Results keep the catalog's ordering.
    async fn search_movie(&self, title: &str, year: Option<u16>)
        -> CatalogResult<Vec<SearchCandidate>>;

    /// Search shows by title, optionally constrained by first-air year.
    /// Results keep the catalog's ordering.
    async fn search_show(&self, title: &str, year: Option<u16>)
        -> CatalogResult<Vec<SearchCandidate>>;

    async fn movie_details(&self, id: MovieId) -> CatalogResult<MovieMetadata>;

    async fn show_details(&self, id: ShowId) -> CatalogResult<ShowMetadata>;

    async fn season_details(&self, show_id: ShowId, season: u32) -> CatalogResult<SeasonMetadata>;
}
