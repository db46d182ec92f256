use cinedex_common::{SourceId, SourceKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::GatewaySettings;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub ratings: RatingsConfig,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite database file. `~` is expanded.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("cinedex.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// TMDB API key. Overridden by `CATALOG_API_KEY` or `TMDB_API_KEY`.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Minimum spacing between catalog requests in milliseconds.
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    /// API root, mainly for pointing tests at a mock server.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_language() -> String {
    "en-US".to_string()
}
fn default_max_concurrent_requests() -> usize {
    4
}
fn default_min_request_interval_ms() -> u64 {
    250
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            language: default_language(),
            max_concurrent_requests: default_max_concurrent_requests(),
            min_request_interval_ms: default_min_request_interval_ms(),
            base_url: None,
        }
    }
}

impl CatalogConfig {
    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            max_concurrent_requests: self.max_concurrent_requests,
            min_request_interval: Duration::from_millis(self.min_request_interval_ms),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// Cap on directory listings in flight across the whole walk.
    #[serde(default = "default_max_concurrent_listings")]
    pub max_concurrent_listings: usize,
}

fn default_max_concurrent_listings() -> usize {
    16
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_listings: default_max_concurrent_listings(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RatingsConfig {
    #[serde(default = "default_ratings_enabled")]
    pub enabled: bool,

    /// Gzipped TSV with `tconst`, `averageRating` and `numVotes` columns.
    #[serde(default = "default_dataset_url")]
    pub dataset_url: String,
}

fn default_ratings_enabled() -> bool {
    true
}
fn default_dataset_url() -> String {
    "https://datasets.imdbws.com/title.ratings.tsv.gz".to_string()
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            enabled: default_ratings_enabled(),
            dataset_url: default_dataset_url(),
        }
    }
}

/// A configured backend with the root paths to scan on it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    pub id: SourceId,

    #[serde(default)]
    pub name: String,

    pub kind: SourceKind,

    /// Root paths to walk, as understood by the backend.
    #[serde(default)]
    pub paths: Vec<String>,

    /// Server URL. WebDAV: `https://host/dav`; SMB: `smb://host/share`.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Where an SMB share is mounted locally.
    #[serde(default)]
    pub mount_point: Option<PathBuf>,
}

impl SourceConfig {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}
