//! TMDB (The Movie Database) catalog provider.
//!
//! Implements [`CatalogProvider`] over the TMDB v3 REST API.
//!
//! Features:
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - 30-second request timeout.
//! - Search results keep TMDB's own ordering.
//!
//! Rate limiting is not done here; wrap the provider in a
//! [`CatalogGateway`](crate::catalog::CatalogGateway).

use std::time::Duration;

use async_trait::async_trait;
use cinedex_common::{MovieId, ShowId};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::catalog::provider::{
    CatalogError, CatalogProvider, CatalogResult, EpisodeMetadata, MovieMetadata,
    SearchCandidate, SeasonMetadata, ShowMetadata,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const TMDB_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/original";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieSearchResult {
    id: u64,
    title: Option<String>,
    release_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvSearchResult {
    id: u64,
    name: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetail {
    id: u64,
    title: Option<String>,
    original_title: Option<String>,
    overview: Option<String>,
    release_date: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    status: Option<String>,
    runtime: Option<u32>,
    genres: Option<Vec<TmdbGenre>>,
    imdb_id: Option<String>,
    images: Option<TmdbImages>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvDetail {
    id: u64,
    name: Option<String>,
    original_name: Option<String>,
    overview: Option<String>,
    first_air_date: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    vote_average: Option<f64>,
    status: Option<String>,
    genres: Option<Vec<TmdbGenre>>,
    seasons: Option<Vec<TmdbSeasonSummary>>,
    external_ids: Option<TmdbExternalIds>,
    images: Option<TmdbImages>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbExternalIds {
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbImages {
    logos: Option<Vec<TmdbImage>>,
}

#[derive(Debug, Deserialize)]
struct TmdbImage {
    file_path: String,
}

#[derive(Debug, Deserialize)]
struct TmdbSeasonSummary {
    season_number: u32,
}

#[derive(Debug, Deserialize)]
struct TmdbSeasonDetail {
    season_number: u32,
    name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Deserialize)]
struct TmdbEpisode {
    episode_number: u32,
    name: Option<String>,
    overview: Option<String>,
    still_path: Option<String>,
    air_date: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// TMDB catalog provider.
///
/// # Examples
///
/// ```no_run
/// use cinedex::catalog::TmdbCatalog;
///
/// let catalog = TmdbCatalog::new("your-api-key".into(), "en-US".into()).unwrap();
/// ```
pub struct TmdbCatalog {
    client: reqwest::Client,
    api_key: String,
    language: String,
    base_url: String,
}

impl TmdbCatalog {
    /// Create a provider for the public TMDB API.
    ///
    /// The `language` parameter should be a language tag such as `"en-US"`.
    pub fn new(api_key: String, language: String) -> CatalogResult<Self> {
        Self::with_base_url(api_key, language, TMDB_BASE_URL.to_string())
    }

    /// Create a provider against a custom API root.
    pub fn with_base_url(api_key: String, language: String, base_url: String) -> CatalogResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            language,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Execute a GET request with 429-retry logic and decode the JSON body.
    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> CatalogResult<T> {
        if self.api_key.is_empty() {
            return Err(CatalogError::NotConfigured);
        }

        let url = format!("{}{}", self.base_url, path);
        let mut retries = 0u32;
        loop {
            debug!(path, "TMDB request");
            let resp = self
                .client
                .get(&url)
                .query(&[("api_key", self.api_key.as_str()), ("language", self.language.as_str())])
                .query(params)
                .send()
                .await
                .map_err(|e| CatalogError::Request(format!("{path}: {e}")))?;

            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    "TMDB returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(CatalogError::NotFound(path.to_string()));
            }
            if !status.is_success() {
                return Err(CatalogError::Status {
                    status: status.as_u16(),
                    path: path.to_string(),
                });
            }

            return resp
                .json()
                .await
                .map_err(|e| CatalogError::Decode(format!("{path}: {e}")));
        }
    }

    async fn search<T: DeserializeOwned>(
        &self,
        path: &str,
        title: &str,
        year_param: &str,
        year: Option<u16>,
    ) -> CatalogResult<Vec<T>> {
        let mut params = vec![("query", title.to_string())];
        if let Some(year) = year {
            params.push((year_param, year.to_string()));
        }
        let body: TmdbSearchResponse<T> = self.get(path, &params).await?;
        Ok(body.results)
    }
}

/// Extract a four-digit year from a date string like `"2023-04-15"`.
fn parse_year(date: &Option<String>) -> Option<u16> {
    date.as_deref()
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<u16>().ok())
}

/// Convert a TMDB image path fragment to a full URL.
fn image_url(path: Option<String>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{TMDB_IMAGE_BASE}{p}"))
}

fn first_logo(images: Option<TmdbImages>) -> Option<String> {
    images
        .and_then(|i| i.logos)
        .and_then(|logos| logos.into_iter().next())
        .and_then(|logo| image_url(Some(logo.file_path)))
}

fn genre_names(genres: Option<Vec<TmdbGenre>>) -> Vec<String> {
    genres
        .unwrap_or_default()
        .into_iter()
        .map(|g| g.name)
        .collect()
}

#[async_trait]
impl CatalogProvider for TmdbCatalog {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> CatalogResult<Vec<SearchCandidate>> {
        let results: Vec<TmdbMovieSearchResult> =
            self.search("/search/movie", title, "year", year).await?;

        Ok(results
            .into_iter()
            .map(|r| SearchCandidate {
                id: r.id,
                title: r.title.unwrap_or_default(),
                year: parse_year(&r.release_date),
                overview: r.overview,
                poster_path: image_url(r.poster_path),
            })
            .collect())
    }

    async fn search_show(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> CatalogResult<Vec<SearchCandidate>> {
        let results: Vec<TmdbTvSearchResult> = self
            .search("/search/tv", title, "first_air_date_year", year)
            .await?;

        Ok(results
            .into_iter()
            .map(|r| SearchCandidate {
                id: r.id,
                title: r.name.unwrap_or_default(),
                year: parse_year(&r.first_air_date),
                overview: r.overview,
                poster_path: image_url(r.poster_path),
            })
            .collect())
    }

    async fn movie_details(&self, id: MovieId) -> CatalogResult<MovieMetadata> {
        let detail: TmdbMovieDetail = self
            .get(
                &format!("/movie/{id}"),
                &[("append_to_response", "images".to_string())],
            )
            .await?;

        Ok(MovieMetadata {
            id: MovieId::new(detail.id),
            title: detail.title.unwrap_or_default(),
            original_title: detail.original_title,
            year: parse_year(&detail.release_date),
            overview: detail.overview,
            poster_path: image_url(detail.poster_path),
            backdrop_path: image_url(detail.backdrop_path),
            logo_path: first_logo(detail.images),
            rating: detail.vote_average,
            status: detail.status,
            runtime_minutes: detail.runtime,
            genres: genre_names(detail.genres),
            imdb_id: detail.imdb_id.filter(|i| !i.is_empty()),
        })
    }

    async fn show_details(&self, id: ShowId) -> CatalogResult<ShowMetadata> {
        let detail: TmdbTvDetail = self
            .get(
                &format!("/tv/{id}"),
                &[("append_to_response", "images,external_ids".to_string())],
            )
            .await?;

        Ok(ShowMetadata {
            id: ShowId::new(detail.id),
            title: detail.name.unwrap_or_default(),
            original_title: detail.original_name,
            first_air_year: parse_year(&detail.first_air_date),
            overview: detail.overview,
            poster_path: image_url(detail.poster_path),
            backdrop_path: image_url(detail.backdrop_path),
            logo_path: first_logo(detail.images),
            rating: detail.vote_average,
            status: detail.status,
            genres: genre_names(detail.genres),
            imdb_id: detail
                .external_ids
                .and_then(|ext| ext.imdb_id)
                .filter(|i| !i.is_empty()),
            season_numbers: detail
                .seasons
                .unwrap_or_default()
                .into_iter()
                .map(|s| s.season_number)
                .collect(),
        })
    }

    async fn season_details(&self, show_id: ShowId, season: u32) -> CatalogResult<SeasonMetadata> {
        let detail: TmdbSeasonDetail = self
            .get(&format!("/tv/{show_id}/season/{season}"), &[])
            .await?;

        Ok(SeasonMetadata {
            show_id,
            number: detail.season_number,
            name: detail.name,
            overview: detail.overview,
            poster_path: image_url(detail.poster_path),
            episodes: detail
                .episodes
                .into_iter()
                .map(|e| EpisodeMetadata {
                    number: e.episode_number,
                    name: e.name.unwrap_or_default(),
                    overview: e.overview,
                    still_path: image_url(e.still_path),
                    air_date: e.air_date,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn catalog(server: &MockServer) -> TmdbCatalog {
        TmdbCatalog::with_base_url("test-key".into(), "en-US".into(), server.uri()).unwrap()
    }

    #[test]
    fn test_year_parsing() {
        assert_eq!(parse_year(&Some("2023-04-15".to_string())), Some(2023));
        assert_eq!(parse_year(&Some("1999".to_string())), Some(1999));
        assert_eq!(parse_year(&None), None);
        assert_eq!(parse_year(&Some("".to_string())), None);
    }

    #[test]
    fn test_image_url_construction() {
        assert_eq!(
            image_url(Some("/abc123.jpg".into())).as_deref(),
            Some("https://image.tmdb.org/t/p/original/abc123.jpg")
        );
        assert_eq!(image_url(Some(String::new())), None);
    }

    #[test]
    fn test_provider_is_available() {
        let provider = TmdbCatalog::new("test-key".into(), "en-US".into()).unwrap();
        assert!(provider.is_available());
        let provider = TmdbCatalog::new(String::new(), "en-US".into()).unwrap();
        assert!(!provider.is_available());
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_request() {
        let provider = TmdbCatalog::new(String::new(), "en-US".into()).unwrap();
        let err = provider.search_movie("Heat", None).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotConfigured));
    }

    #[tokio::test]
    async fn test_search_movie_keeps_catalog_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("query", "The Matrix"))
            .and(query_param("year", "1999"))
            .and(query_param("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"id": 603, "title": "The Matrix", "release_date": "1999-03-30"},
                    {"id": 10999, "title": "Making The Matrix", "release_date": "1999-01-01"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = catalog(&server)
            .await
            .search_movie("The Matrix", Some(1999))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 603);
        assert_eq!(results[0].year, Some(1999));
    }

    #[tokio::test]
    async fn test_search_show_passes_first_air_year() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .and(query_param("first_air_date_year", "2008"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"id": 1396, "name": "Breaking Bad", "first_air_date": "2008-01-20"}]
            })))
            .mount(&server)
            .await;

        let results = catalog(&server)
            .await
            .search_show("Breaking Bad", Some(2008))
            .await
            .unwrap();
        assert_eq!(results[0].title, "Breaking Bad");
    }

    #[tokio::test]
    async fn test_show_details_parses_external_ids_and_seasons() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/1396"))
            .and(query_param("append_to_response", "images,external_ids"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 1396,
                "name": "Breaking Bad",
                "first_air_date": "2008-01-20",
                "poster_path": "/bb.jpg",
                "status": "Ended",
                "genres": [{"id": 18, "name": "Drama"}],
                "seasons": [{"season_number": 0}, {"season_number": 1}],
                "external_ids": {"imdb_id": "tt0903747"},
                "images": {"logos": [{"file_path": "/logo.png"}]}
            })))
            .mount(&server)
            .await;

        let show = catalog(&server).await.show_details(ShowId::new(1396)).await.unwrap();
        assert_eq!(show.first_air_year, Some(2008));
        assert_eq!(show.imdb_id.as_deref(), Some("tt0903747"));
        assert_eq!(show.season_numbers, vec![0, 1]);
        assert_eq!(show.genres, vec!["Drama".to_string()]);
        assert_eq!(
            show.logo_path.as_deref(),
            Some("https://image.tmdb.org/t/p/original/logo.png")
        );
    }

    #[tokio::test]
    async fn test_season_details_parses_episodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tv/1396/season/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "season_number": 1,
                "name": "Season 1",
                "episodes": [
                    {"episode_number": 1, "name": "Pilot", "still_path": "/p.jpg"},
                    {"episode_number": 2, "name": "Cat's in the Bag..."}
                ]
            })))
            .mount(&server)
            .await;

        let season = catalog(&server)
            .await
            .season_details(ShowId::new(1396), 1)
            .await
            .unwrap();
        assert_eq!(season.episodes.len(), 2);
        assert_eq!(season.episode(1).map(|e| e.name.as_str()), Some("Pilot"));
    }

    #[tokio::test]
    async fn test_not_found_maps_to_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = catalog(&server).await.movie_details(MovieId::new(1)).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rate_limited_request_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 603,
                "title": "The Matrix",
                "release_date": "1999-03-30",
                "imdb_id": "tt0133093"
            })))
            .mount(&server)
            .await;

        let movie = catalog(&server).await.movie_details(MovieId::new(603)).await.unwrap();
        assert_eq!(movie.title, "The Matrix");
        assert_eq!(movie.imdb_id.as_deref(), Some("tt0133093"));
    }
}
