//! Shared test harness for integration tests.
//!
//! Provides an in-memory [`FakeBackend`], a scripted [`FakeCatalog`] that
//! counts its calls, and [`TestLibrary`] which backs a real SQLite store with
//! a database file in a temporary directory.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use cinedex::backend::{Backend, BackendError, BackendResult, DirEntry};
use cinedex::catalog::{
    CatalogError, CatalogGateway, CatalogProvider, CatalogResult, EpisodeMetadata,
    GatewaySettings, MovieMetadata, SearchCandidate, SeasonMetadata, ShowMetadata,
};
use cinedex::config::SourceConfig;
use cinedex::scanner::Scanner;
use cinedex_common::{MovieId, ShowId, SourceId, SourceKind};
use cinedex_db::models::{LibrarySnapshot, Movie, Show, VideoFile};
use cinedex_db::pool::init_pool;
use cinedex_db::store::{LibraryStore, LibraryWriter, SqliteLibraryStore};

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Directory tree held in memory. Paths are `/`-separated and absolute.
pub struct FakeBackend {
    kind: SourceKind,
    dirs: Mutex<BTreeMap<String, BTreeMap<String, DirEntry>>>,
    broken: Mutex<HashSet<String>>,
    listings: AtomicUsize,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            kind: SourceKind::Local,
            dirs: Mutex::default(),
            broken: Mutex::default(),
            listings: AtomicUsize::new(0),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `kind` as the backend kind.
    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_files(paths: &[&str]) -> Self {
        let backend = Self::new();
        for path in paths {
            backend.add_file(path);
        }
        backend
    }

    /// Add a file, creating its parent directories.
    pub fn add_file(&self, path: &str) {
        let mut dirs = self.dirs.lock();
        let mut parent = String::from("/");
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        for (i, segment) in segments.iter().enumerate() {
            let is_last = i + 1 == segments.len();
            let entry = if is_last {
                DirEntry::file(*segment, 1024)
            } else {
                DirEntry::directory(*segment)
            };
            dirs.entry(parent.clone())
                .or_default()
                .insert(segment.to_string(), entry);
            let child = if parent == "/" {
                format!("/{segment}")
            } else {
                format!("{parent}/{segment}")
            };
            if !is_last {
                dirs.entry(child.clone()).or_default();
            }
            parent = child;
        }
    }

    pub fn remove_file(&self, path: &str) {
        let (dir, name) = path.rsplit_once('/').unwrap();
        let dir = if dir.is_empty() { "/" } else { dir };
        if let Some(entries) = self.dirs.lock().get_mut(dir) {
            entries.remove(name);
        }
    }

    /// Add directory `name` under `parent` the way a double-encoding server
    /// lists it: the entry carries the percent-encoded name, listing that
    /// path fails, and only the decoded path lists `files`.
    pub fn add_encoded_dir(&self, parent: &str, name: &str, files: &[&str]) {
        for file in files {
            self.add_file(&format!("{parent}/{name}/{file}"));
        }
        let encoded = urlencoding::encode(name).into_owned();
        if let Some(entries) = self.dirs.lock().get_mut(parent) {
            entries.remove(name);
            entries.insert(encoded.clone(), DirEntry::directory(encoded.clone()));
        }
        self.break_dir(&format!("{parent}/{encoded}"));
    }

    /// Make listing `path` fail.
    pub fn break_dir(&self, path: &str) {
        self.broken.lock().insert(path.to_string());
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for FakeBackend {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn list(&self, path: &str) -> BackendResult<Vec<DirEntry>> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if self.broken.lock().contains(path) {
            return Err(BackendError::Status {
                status: 500,
                path: path.to_string(),
            });
        }
        self.dirs
            .lock()
            .get(path)
            .map(|entries| entries.values().cloned().collect())
            .ok_or_else(|| {
                BackendError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no such directory: {path}"),
                ))
            })
    }

    fn resolve_url(&self, path: &str) -> String {
        format!("fake://{path}")
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Call counters of a [`FakeCatalog`].
#[derive(Default)]
pub struct CallCounts {
    pub search_movie: AtomicUsize,
    pub search_show: AtomicUsize,
    pub movie_details: AtomicUsize,
    pub show_details: AtomicUsize,
    pub season_details: AtomicUsize,
}

impl CallCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Catalog answering from registered fixtures.
#[derive(Default)]
pub struct FakeCatalog {
    movie_results: HashMap<String, Vec<SearchCandidate>>,
    show_results: HashMap<String, Vec<SearchCandidate>>,
    movies: Mutex<HashMap<MovieId, MovieMetadata>>,
    shows: Mutex<HashMap<ShowId, ShowMetadata>>,
    seasons: HashMap<(ShowId, u32), SeasonMetadata>,
    failing_movies: Mutex<HashSet<MovieId>>,
    failing_shows: Mutex<HashSet<ShowId>>,
    latency: Duration,
    pub calls: CallCounts,
}

fn key(title: &str) -> String {
    title.to_lowercase()
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Register a movie found by searching for `title`.
    pub fn movie(mut self, id: u64, title: &str, year: u16) -> Self {
        self.movie_results
            .entry(key(title))
            .or_default()
            .push(SearchCandidate {
                id,
                title: title.to_string(),
                year: Some(year),
                overview: None,
                poster_path: None,
            });
        self.movies.get_mut().insert(
            MovieId::new(id),
            MovieMetadata {
                id: MovieId::new(id),
                title: title.to_string(),
                year: Some(year),
                imdb_id: Some(format!("tt{id:07}")),
                poster_path: Some(format!("/poster-{id}.jpg")),
                ..Default::default()
            },
        );
        self
    }

    /// Register a show found by searching for `title`, with the named
    /// episodes of each season.
    pub fn show(mut self, id: u64, title: &str, year: u16, seasons: &[(u32, &[&str])]) -> Self {
        let show_id = ShowId::new(id);
        self.show_results
            .entry(key(title))
            .or_default()
            .push(SearchCandidate {
                id,
                title: title.to_string(),
                year: Some(year),
                overview: None,
                poster_path: None,
            });
        self.shows.get_mut().insert(
            show_id,
            ShowMetadata {
                id: show_id,
                title: title.to_string(),
                first_air_year: Some(year),
                imdb_id: Some(format!("tt{id:07}")),
                season_numbers: seasons.iter().map(|(n, _)| *n).collect(),
                ..Default::default()
            },
        );
        for (number, episodes) in seasons {
            self.seasons.insert(
                (show_id, *number),
                SeasonMetadata {
                    show_id,
                    number: *number,
                    name: Some(format!("Season {number}")),
                    episodes: episodes
                        .iter()
                        .enumerate()
                        .map(|(i, name)| EpisodeMetadata {
                            number: i as u32 + 1,
                            name: name.to_string(),
                            ..Default::default()
                        })
                        .collect(),
                    ..Default::default()
                },
            );
        }
        self
    }

    /// Change the poster the catalog reports for a movie.
    pub fn set_movie_poster(&self, id: u64, poster: &str) {
        if let Some(movie) = self.movies.lock().get_mut(&MovieId::new(id)) {
            movie.poster_path = Some(poster.to_string());
        }
    }

    /// Make details requests for a movie fail.
    pub fn fail_movie(&self, id: u64) {
        self.failing_movies.lock().insert(MovieId::new(id));
    }

    pub fn fail_show(&self, id: u64) {
        self.failing_shows.lock().insert(ShowId::new(id));
    }

    async fn delay(&self) {
        if self.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl CatalogProvider for FakeCatalog {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn search_movie(
        &self,
        title: &str,
        _year: Option<u16>,
    ) -> CatalogResult<Vec<SearchCandidate>> {
        self.calls.search_movie.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self.movie_results.get(&key(title)).cloned().unwrap_or_default())
    }

    async fn search_show(
        &self,
        title: &str,
        _year: Option<u16>,
    ) -> CatalogResult<Vec<SearchCandidate>> {
        self.calls.search_show.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        Ok(self.show_results.get(&key(title)).cloned().unwrap_or_default())
    }

    async fn movie_details(&self, id: MovieId) -> CatalogResult<MovieMetadata> {
        self.calls.movie_details.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.failing_movies.lock().contains(&id) {
            return Err(CatalogError::Status {
                status: 503,
                path: format!("/movie/{id}"),
            });
        }
        self.movies
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("movie {id}")))
    }

    async fn show_details(&self, id: ShowId) -> CatalogResult<ShowMetadata> {
        self.calls.show_details.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if self.failing_shows.lock().contains(&id) {
            return Err(CatalogError::Status {
                status: 503,
                path: format!("/tv/{id}"),
            });
        }
        self.shows
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("show {id}")))
    }

    async fn season_details(&self, show_id: ShowId, season: u32) -> CatalogResult<SeasonMetadata> {
        self.calls.season_details.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        self.seasons
            .get(&(show_id, season))
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("show {show_id} season {season}")))
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// SQLite library in a temporary directory.
pub struct TestLibrary {
    _dir: tempfile::TempDir,
    pub store: Arc<SqliteLibraryStore>,
}

impl TestLibrary {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = dir.path().join("library.db");
        let pool = init_pool(&db_path.to_string_lossy()).expect("failed to open database");
        Self {
            _dir: dir,
            store: Arc::new(SqliteLibraryStore::new(pool)),
        }
    }

    pub fn snapshot(&self) -> LibrarySnapshot {
        self.store.snapshot().expect("snapshot failed")
    }

    pub fn unscanned(&self) -> Vec<VideoFile> {
        self.store.unscanned_files().expect("unscanned files failed")
    }

    pub fn save_movie(&self, movie: &Movie) {
        self.store
            .transaction(&mut |w| w.save_movie(movie))
            .expect("save movie failed");
    }

    pub fn save_show(&self, show: &Show) {
        self.store
            .transaction(&mut |w| w.save_show(show))
            .expect("save show failed");
    }
}

/// Store whose transactions fail after the entities have been written.
pub struct FailingStore {
    pub inner: Arc<SqliteLibraryStore>,
}

struct FailingWriter<'a> {
    inner: &'a mut dyn LibraryWriter,
}

impl LibraryWriter for FailingWriter<'_> {
    fn save_movie(&mut self, movie: &Movie) -> cinedex_common::Result<()> {
        self.inner.save_movie(movie)
    }

    fn save_show(&mut self, show: &Show) -> cinedex_common::Result<()> {
        self.inner.save_show(show)
    }

    fn set_unscanned_files(&mut self, _files: &[VideoFile]) -> cinedex_common::Result<()> {
        Err(cinedex_common::Error::database("disk I/O error"))
    }

    fn delete_empty_movies(&mut self) -> cinedex_common::Result<usize> {
        self.inner.delete_empty_movies()
    }

    fn delete_empty_shows(&mut self) -> cinedex_common::Result<usize> {
        self.inner.delete_empty_shows()
    }
}

impl LibraryStore for FailingStore {
    fn snapshot(&self) -> cinedex_common::Result<LibrarySnapshot> {
        self.inner.snapshot()
    }

    fn unscanned_files(&self) -> cinedex_common::Result<Vec<VideoFile>> {
        self.inner.unscanned_files()
    }

    fn clear_unscanned_files(&self) -> cinedex_common::Result<()> {
        self.inner.clear_unscanned_files()
    }

    fn transaction(
        &self,
        f: &mut dyn FnMut(&mut dyn LibraryWriter) -> cinedex_common::Result<()>,
    ) -> cinedex_common::Result<()> {
        self.inner.transaction(&mut |w| {
            let mut failing = FailingWriter { inner: w };
            f(&mut failing)
        })
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

pub fn source(id: &str, paths: &[&str]) -> SourceConfig {
    SourceConfig {
        id: SourceId::new(id),
        name: String::new(),
        kind: SourceKind::Local,
        paths: paths.iter().map(|p| p.to_string()).collect(),
        url: None,
        username: None,
        password: None,
        mount_point: None,
    }
}

pub fn gateway(catalog: Arc<FakeCatalog>) -> Arc<CatalogGateway> {
    Arc::new(CatalogGateway::new(
        catalog,
        GatewaySettings {
            max_concurrent_requests: 8,
            min_request_interval: Duration::ZERO,
        },
    ))
}

/// Scanner over one fake source `media` rooted at `/media`.
pub fn scanner(
    store: Arc<dyn LibraryStore>,
    catalog: Arc<FakeCatalog>,
    backend: Arc<FakeBackend>,
) -> Scanner {
    Scanner::new(store, gateway(catalog)).with_source(source("media", &["/media"]), backend)
}
