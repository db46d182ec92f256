//! Media library scanner.
//!
//! A scan walks every configured source, identifies new video files against
//! the catalog and reconciles the result with the stored library in one
//! transaction.
//!
//! # Module layout
//!
//! - `state` -- Shared scan state and the in-flight fetch maps.
//! - `resolver` -- Identification of new files ([`find_best_match`]).
//! - `walker` -- Concurrent recursive directory walk.
//! - `refresh` -- Full metadata refresh for forced scans.
//! - `reconcile` -- Pruning, saving and ratings backfill.

mod reconcile;
mod refresh;
mod resolver;
mod state;
mod walker;

pub use resolver::find_best_match;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use anyhow::Context;
use cinedex_db::pool::init_pool;
use cinedex_db::store::{LibraryStore, SqliteLibraryStore};
use serde::Serialize;
use tokio::sync::{broadcast, Semaphore};
use tracing::{error, info, warn};

use crate::backend::{build_backend, Backend};
use crate::catalog::{CatalogGateway, TmdbCatalog};
use crate::config::{Config, SourceConfig};
use crate::ratings::{DatasetRatingsStore, RatingsStage, RatingsStore};

use reconcile::{backfill_ratings, reconcile, ReconcileStats};
use refresh::refresh_library;
use resolver::Resolver;
use state::ScanState;
use walker::Walker;

const DEFAULT_MAX_CONCURRENT_LISTINGS: usize = 16;
const EVENT_CAPACITY: usize = 64;

/// Progress callback for scan operations.
pub type ProgressCallback = Box<dyn Fn(ScanProgress) + Send + Sync>;

/// Phase of a running scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStage {
    Preparing,
    Refreshing,
    Walking,
    Reconciling,
    Ratings,
    Finished,
}

/// Scan progress information.
///
/// The last event of a scan has `done` set, or carries an `error`.
#[derive(Debug, Clone, Serialize)]
pub struct ScanProgress {
    pub stage: ScanStage,
    pub detail: String,
    pub done: bool,
    pub error: Option<String>,
}

/// Outcome of [`Scanner::start_scan`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Another scan was running; nothing was done.
    pub skipped: bool,
    pub new_movies: usize,
    pub new_shows: usize,
    pub saved_movies: usize,
    pub saved_shows: usize,
    pub unscanned: usize,
    pub pruned_files: usize,
    pub ratings_updated: usize,
}

impl From<ReconcileStats> for ScanSummary {
    fn from(stats: ReconcileStats) -> Self {
        Self {
            skipped: false,
            new_movies: stats.new_movies,
            new_shows: stats.new_shows,
            saved_movies: stats.saved_movies,
            saved_shows: stats.saved_shows,
            unscanned: stats.unscanned,
            pruned_files: stats.pruned_files,
            ratings_updated: 0,
        }
    }
}

/// Failure that aborts a scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed to load library: {0}")]
    Snapshot(cinedex_common::Error),

    #[error("failed to save library: {0}")]
    Storage(cinedex_common::Error),
}

/// Whether a scan is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScanStatus {
    Idle = 0,
    Scanning = 1,
}

/// Holds the scanner in [`ScanStatus::Scanning`] until dropped.
struct ScanGuard<'a>(&'a AtomicU8);

impl<'a> ScanGuard<'a> {
    fn acquire(status: &'a AtomicU8) -> Option<Self> {
        status
            .compare_exchange(
                ScanStatus::Idle as u8,
                ScanStatus::Scanning as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| Self(status))
    }
}

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(ScanStatus::Idle as u8, Ordering::Release);
    }
}

struct Reporter<'a> {
    callback: Option<ProgressCallback>,
    events: &'a broadcast::Sender<ScanProgress>,
}

impl Reporter<'_> {
    fn emit(&self, progress: ScanProgress) {
        if let Some(callback) = &self.callback {
            callback(progress.clone());
        }
        // No subscribers is fine
        let _ = self.events.send(progress);
    }

    fn stage(&self, stage: ScanStage, detail: impl Into<String>) {
        self.emit(ScanProgress {
            stage,
            detail: detail.into(),
            done: false,
            error: None,
        });
    }
}

/// A source together with the backend that lists it.
pub struct ScanSource {
    pub config: SourceConfig,
    pub backend: Arc<dyn Backend>,
}

/// Scan orchestrator. At most one scan runs at a time per scanner.
pub struct Scanner {
    store: Arc<dyn LibraryStore>,
    gateway: Arc<CatalogGateway>,
    ratings: Option<Arc<dyn RatingsStore>>,
    sources: Vec<ScanSource>,
    max_concurrent_listings: usize,
    status: AtomicU8,
    events: broadcast::Sender<ScanProgress>,
}

impl Scanner {
    /// Create a scanner with no sources and no ratings store.
    pub fn new(store: Arc<dyn LibraryStore>, gateway: Arc<CatalogGateway>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            gateway,
            ratings: None,
            sources: Vec::new(),
            max_concurrent_listings: DEFAULT_MAX_CONCURRENT_LISTINGS,
            status: AtomicU8::new(ScanStatus::Idle as u8),
            events,
        }
    }

    pub fn with_source(mut self, config: SourceConfig, backend: Arc<dyn Backend>) -> Self {
        self.sources.push(ScanSource { config, backend });
        self
    }

    pub fn with_ratings(mut self, ratings: Arc<dyn RatingsStore>) -> Self {
        self.ratings = Some(ratings);
        self
    }

    pub fn with_max_concurrent_listings(mut self, limit: usize) -> Self {
        self.max_concurrent_listings = limit.max(1);
        self
    }

    /// Build a scanner with the SQLite store, TMDB catalog, configured
    /// sources and, if enabled, the dataset ratings store.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let db_path = config.database.path.to_string_lossy();
        let pool = init_pool(&db_path)
            .with_context(|| format!("Failed to open library database: {db_path}"))?;
        let store = Arc::new(SqliteLibraryStore::new(pool.clone()));

        let catalog = match &config.catalog.base_url {
            Some(base_url) => TmdbCatalog::with_base_url(
                config.catalog.api_key.clone(),
                config.catalog.language.clone(),
                base_url.clone(),
            ),
            None => TmdbCatalog::new(
                config.catalog.api_key.clone(),
                config.catalog.language.clone(),
            ),
        }?;
        let gateway = Arc::new(CatalogGateway::new(
            Arc::new(catalog),
            config.catalog.gateway_settings(),
        ));

        let mut scanner = Scanner::new(store, gateway)
            .with_max_concurrent_listings(config.scanner.max_concurrent_listings);

        for source in &config.sources {
            let backend = build_backend(source)
                .with_context(|| format!("Failed to set up source '{}'", source.id))?;
            scanner = scanner.with_source(source.clone(), backend);
        }

        if config.ratings.enabled {
            let ratings = DatasetRatingsStore::new(config.ratings.dataset_url.clone(), pool)?;
            scanner = scanner.with_ratings(Arc::new(ratings));
        }

        Ok(scanner)
    }

    pub fn store(&self) -> &Arc<dyn LibraryStore> {
        &self.store
    }

    /// Receive progress events of every scan started after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.events.subscribe()
    }

    pub fn status(&self) -> ScanStatus {
        if self.status.load(Ordering::Acquire) == ScanStatus::Scanning as u8 {
            ScanStatus::Scanning
        } else {
            ScanStatus::Idle
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.status() == ScanStatus::Scanning
    }

    /// Run one scan.
    ///
    /// Returns a summary with `skipped` set, without doing anything, when a
    /// scan is already running. With `force_refresh`, the metadata of every
    /// stored entity is fetched again before the walk.
    pub async fn start_scan(
        &self,
        force_refresh: bool,
        on_progress: Option<ProgressCallback>,
    ) -> Result<ScanSummary, ScanError> {
        let Some(_guard) = ScanGuard::acquire(&self.status) else {
            info!("Scan already in progress, ignoring request");
            return Ok(ScanSummary {
                skipped: true,
                ..Default::default()
            });
        };

        let reporter = Reporter {
            callback: on_progress,
            events: &self.events,
        };

        info!(force_refresh, sources = self.sources.len(), "Starting library scan");
        let result = self.run(force_refresh, &reporter).await;

        match &result {
            Ok(summary) => {
                info!(?summary, "Scan complete");
                reporter.emit(ScanProgress {
                    stage: ScanStage::Finished,
                    detail: format!(
                        "{} new movies, {} new shows, {} unscanned",
                        summary.new_movies, summary.new_shows, summary.unscanned
                    ),
                    done: true,
                    error: None,
                });
            }
            Err(e) => {
                error!(error = %e, "Scan failed");
                reporter.emit(ScanProgress {
                    stage: ScanStage::Finished,
                    detail: "Scan failed".to_string(),
                    done: false,
                    error: Some(e.to_string()),
                });
            }
        }

        result
    }

    async fn run(&self, force_refresh: bool, reporter: &Reporter<'_>) -> Result<ScanSummary, ScanError> {
        reporter.stage(ScanStage::Preparing, "Loading library");
        if let Err(e) = self.store.clear_unscanned_files() {
            warn!(error = %e, "Failed to clear unscanned files");
        }
        let snapshot = self.store.snapshot().map_err(ScanError::Snapshot)?;
        let state = ScanState::new(snapshot);

        if force_refresh {
            reporter.stage(ScanStage::Refreshing, "Refreshing library metadata");
            let stats = refresh_library(&self.gateway, &state).await;
            info!(refreshed = stats.refreshed, failed = stats.failed, "Metadata refresh finished");
        }

        let resolver = Resolver::new(self.gateway.clone());
        let listings = Semaphore::new(self.max_concurrent_listings);
        for source in &self.sources {
            for root in &source.config.paths {
                reporter.stage(
                    ScanStage::Walking,
                    format!("{}: {}", source.config.display_name(), root),
                );
                let walker = Walker::new(
                    source.config.id.clone(),
                    source.backend.clone(),
                    &resolver,
                    &state,
                    &listings,
                );
                if let Err(e) = walker.walk(root).await {
                    warn!(source_id = %source.config.id, path = %root, error = %e, "Failed to scan path");
                }
            }
        }

        reporter.stage(ScanStage::Reconciling, "Saving library");
        let mut library =
            reconcile(state.into_inner(), self.store.as_ref()).map_err(ScanError::Storage)?;
        let mut summary = ScanSummary::from(library.stats);

        if let Some(ratings) = &self.ratings {
            reporter.stage(ScanStage::Ratings, "Refreshing ratings");
            let on_progress = |stage: RatingsStage| reporter.stage(ScanStage::Ratings, stage.to_string());
            match backfill_ratings(
                self.store.as_ref(),
                ratings.as_ref(),
                &mut library,
                force_refresh,
                &on_progress,
            )
            .await
            {
                Ok(updated) => summary.ratings_updated = updated,
                Err(e) => warn!(error = %e, "Ratings refresh failed"),
            }
        }

        Ok(summary)
    }
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("provider", &self.gateway.provider_name())
            .field("sources", &self.sources.len())
            .field("status", &self.status())
            .finish()
    }
}
