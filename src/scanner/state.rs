//! Mutable state shared by every task of one scan.
//!
//! All maps live behind a single lock so that "is this entity known, and if
//! not, is someone already fetching it?" is answered and acted upon
//! atomically. The lock is never held across an `.await`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use cinedex_common::{MovieId, SeasonKey, ShowId, VideoFileId};
use cinedex_db::models::{FileOwner, LibrarySnapshot, Movie, Show, VideoFile};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use crate::catalog::{CatalogResult, MovieMetadata, SeasonMetadata, ShowMetadata};

/// An in-flight catalog fetch that any number of tasks can await.
pub(crate) type SharedFetch<T> = Shared<BoxFuture<'static, CatalogResult<Arc<T>>>>;

/// How a resolver should obtain an entity.
pub(crate) enum Lookup<T> {
    /// Already in the library or discovered earlier in this scan.
    Known,
    /// Await this fetch; it may have been started by another task.
    Fetch(SharedFetch<T>),
}

/// How a resolver should obtain season details.
pub(crate) enum SeasonLookup {
    Cached(Arc<SeasonMetadata>),
    Fetch(SharedFetch<SeasonMetadata>),
}

#[derive(Default)]
pub(crate) struct ScanInner {
    /// Library as persisted at scan start, mutated in place as files attach.
    pub current_movies: BTreeMap<MovieId, Movie>,
    pub current_shows: BTreeMap<ShowId, Show>,
    /// Entities first seen in this scan.
    pub new_movies: BTreeMap<MovieId, Movie>,
    pub new_shows: BTreeMap<ShowId, Show>,
    pending_movies: HashMap<MovieId, SharedFetch<MovieMetadata>>,
    pending_shows: HashMap<ShowId, SharedFetch<ShowMetadata>>,
    pending_seasons: HashMap<SeasonKey, SharedFetch<SeasonMetadata>>,
    /// Season details fetched successfully during this scan.
    seasons: HashMap<SeasonKey, Arc<SeasonMetadata>>,
    pub found_files: HashSet<VideoFileId>,
    pub file_index: HashMap<VideoFileId, FileOwner>,
    pub dirty_movies: HashSet<MovieId>,
    pub dirty_shows: HashSet<ShowId>,
    pub unscanned: Vec<VideoFile>,
}

impl ScanInner {
    fn movie_mut(&mut self, id: MovieId) -> Option<(&mut Movie, bool)> {
        if let Some(movie) = self.current_movies.get_mut(&id) {
            return Some((movie, true));
        }
        self.new_movies.get_mut(&id).map(|m| (m, false))
    }

    fn show_mut(&mut self, id: ShowId) -> Option<(&mut Show, bool)> {
        if let Some(show) = self.current_shows.get_mut(&id) {
            return Some((show, true));
        }
        self.new_shows.get_mut(&id).map(|s| (s, false))
    }

    fn show(&self, id: ShowId) -> Option<&Show> {
        self.current_shows
            .get(&id)
            .or_else(|| self.new_shows.get(&id))
    }
}

/// Register `start()` as the pending fetch for `key` unless one is already in
/// flight, returning the fetch to await either way.
fn join_or_start<K: Hash + Eq, T>(
    pending: &mut HashMap<K, SharedFetch<T>>,
    key: K,
    start: impl FnOnce() -> BoxFuture<'static, CatalogResult<Arc<T>>>,
) -> SharedFetch<T> {
    pending
        .entry(key)
        .or_insert_with(|| start().shared())
        .clone()
}

/// Drop the pending entry for `key` if it is still `fetch`. A newer fetch
/// registered after `fetch` failed stays in place.
fn clear_pending<K: Hash + Eq, T>(
    pending: &mut HashMap<K, SharedFetch<T>>,
    key: &K,
    fetch: &SharedFetch<T>,
) {
    if pending.get(key).is_some_and(|f| f.ptr_eq(fetch)) {
        pending.remove(key);
    }
}

/// Scan-lifetime state. Created from the library snapshot at scan start and
/// consumed by the reconciler at the end.
pub(crate) struct ScanState {
    inner: Mutex<ScanInner>,
}

impl ScanState {
    pub fn new(snapshot: LibrarySnapshot) -> Self {
        let mut file_index = HashMap::new();
        for movie in snapshot.movies.values() {
            for file in &movie.files {
                file_index.insert(file.id, FileOwner::Movie(movie.id));
            }
        }
        for show in snapshot.shows.values() {
            for season in show.seasons.values() {
                for episode in season.episodes.values() {
                    for file in &episode.files {
                        file_index.insert(
                            file.id,
                            FileOwner::Episode {
                                show_id: show.id,
                                season: season.number,
                                episode: episode.number,
                            },
                        );
                    }
                }
            }
        }

        Self {
            inner: Mutex::new(ScanInner {
                current_movies: snapshot.movies,
                current_shows: snapshot.shows,
                file_index,
                ..Default::default()
            }),
        }
    }

    pub fn into_inner(self) -> ScanInner {
        self.inner.into_inner()
    }

    /// Ids and season numbers of every persisted entity, for the refresh pass.
    pub fn current_ids(&self) -> (Vec<MovieId>, Vec<(ShowId, Vec<u32>)>) {
        let inner = self.inner.lock();
        let movies = inner.current_movies.keys().copied().collect();
        let shows = inner
            .current_shows
            .values()
            .map(|s| (s.id, s.seasons.keys().copied().collect()))
            .collect();
        (movies, shows)
    }

    /// Record that `id` was seen this scan. Returns `false` when it had
    /// already been seen, e.g. through overlapping root paths.
    pub fn mark_found(&self, id: VideoFileId) -> bool {
        self.inner.lock().found_files.insert(id)
    }

    /// Update the resolved URL of an already matched file.
    ///
    /// Returns `false` if the file is not in the library yet and needs to be
    /// identified.
    pub fn refresh_known_file(&self, file: &VideoFile) -> bool {
        let mut inner = self.inner.lock();
        let Some(owner) = inner.file_index.get(&file.id).copied() else {
            return false;
        };

        let (existing, is_current) = match owner {
            FileOwner::Movie(id) => match inner.movie_mut(id) {
                Some((movie, is_current)) => {
                    (movie.files.iter_mut().find(|f| f.id == file.id), is_current)
                }
                None => (None, false),
            },
            FileOwner::Episode {
                show_id,
                season,
                episode,
            } => match inner.show_mut(show_id) {
                Some((show, is_current)) => (
                    show.episode_mut(season, episode)
                        .and_then(|e| e.files.iter_mut().find(|f| f.id == file.id)),
                    is_current,
                ),
                None => (None, false),
            },
        };

        let Some(existing) = existing else {
            return false;
        };
        if existing.resolved_url == file.resolved_url {
            return true;
        }

        existing.resolved_url = file.resolved_url.clone();
        if is_current {
            match owner {
                FileOwner::Movie(id) => inner.dirty_movies.insert(id),
                FileOwner::Episode { show_id, .. } => inner.dirty_shows.insert(show_id),
            };
        }
        true
    }

    pub fn add_unscanned(&self, file: VideoFile) {
        self.inner.lock().unscanned.push(file);
    }

    // ---------------------------------------------------------------------
    // Movies
    // ---------------------------------------------------------------------

    pub fn movie_lookup(
        &self,
        id: MovieId,
        start: impl FnOnce() -> BoxFuture<'static, CatalogResult<Arc<MovieMetadata>>>,
    ) -> Lookup<MovieMetadata> {
        let mut inner = self.inner.lock();
        if inner.current_movies.contains_key(&id) || inner.new_movies.contains_key(&id) {
            return Lookup::Known;
        }
        Lookup::Fetch(join_or_start(&mut inner.pending_movies, id, start))
    }

    /// Clear the pending fetch for `id` and keep the fetched movie.
    pub fn settle_movie(
        &self,
        id: MovieId,
        fetch: &SharedFetch<MovieMetadata>,
        result: &CatalogResult<Arc<MovieMetadata>>,
    ) {
        let mut inner = self.inner.lock();
        clear_pending(&mut inner.pending_movies, &id, fetch);
        if let Ok(meta) = result {
            if !inner.current_movies.contains_key(&id) {
                inner
                    .new_movies
                    .entry(id)
                    .or_insert_with(|| meta.to_movie());
            }
        }
    }

    /// Attach a newly identified file to a known movie.
    pub fn attach_movie_file(&self, id: MovieId, file: VideoFile) -> bool {
        let mut inner = self.inner.lock();
        let file_id = file.id;
        let Some((movie, is_current)) = inner.movie_mut(id) else {
            return false;
        };
        movie.files.push(file);
        if is_current {
            inner.dirty_movies.insert(id);
        }
        inner.file_index.insert(file_id, FileOwner::Movie(id));
        true
    }

    // ---------------------------------------------------------------------
    // Shows and seasons
    // ---------------------------------------------------------------------

    pub fn show_lookup(
        &self,
        id: ShowId,
        start: impl FnOnce() -> BoxFuture<'static, CatalogResult<Arc<ShowMetadata>>>,
    ) -> Lookup<ShowMetadata> {
        let mut inner = self.inner.lock();
        if inner.current_shows.contains_key(&id) || inner.new_shows.contains_key(&id) {
            return Lookup::Known;
        }
        Lookup::Fetch(join_or_start(&mut inner.pending_shows, id, start))
    }

    pub fn settle_show(
        &self,
        id: ShowId,
        fetch: &SharedFetch<ShowMetadata>,
        result: &CatalogResult<Arc<ShowMetadata>>,
    ) {
        let mut inner = self.inner.lock();
        clear_pending(&mut inner.pending_shows, &id, fetch);
        if let Ok(meta) = result {
            if !inner.current_shows.contains_key(&id) {
                inner.new_shows.entry(id).or_insert_with(|| meta.to_show());
            }
        }
    }

    /// Whether season details should be applied when attaching a file to
    /// this episode: the episode is missing or still carries a placeholder
    /// name. Details already fetched this scan are always applied.
    pub fn needs_season(&self, key: SeasonKey, episode: u32) -> bool {
        let inner = self.inner.lock();
        if inner.seasons.contains_key(&key) {
            return true;
        }
        match inner
            .show(key.show_id)
            .and_then(|s| s.episode(key.season, episode))
        {
            Some(existing) => existing.has_placeholder_name(),
            None => true,
        }
    }

    pub fn season_lookup(
        &self,
        key: SeasonKey,
        start: impl FnOnce() -> BoxFuture<'static, CatalogResult<Arc<SeasonMetadata>>>,
    ) -> SeasonLookup {
        let mut inner = self.inner.lock();
        if let Some(season) = inner.seasons.get(&key) {
            return SeasonLookup::Cached(season.clone());
        }
        SeasonLookup::Fetch(join_or_start(&mut inner.pending_seasons, key, start))
    }

    pub fn settle_season(
        &self,
        key: SeasonKey,
        fetch: &SharedFetch<SeasonMetadata>,
        result: &CatalogResult<Arc<SeasonMetadata>>,
    ) {
        let mut inner = self.inner.lock();
        clear_pending(&mut inner.pending_seasons, &key, fetch);
        if let Ok(meta) = result {
            inner.seasons.entry(key).or_insert_with(|| meta.clone());
        }
    }

    /// Store season details fetched outside the walk.
    pub fn cache_season(&self, key: SeasonKey, meta: Arc<SeasonMetadata>) {
        self.inner.lock().seasons.insert(key, meta);
    }

    /// Attach a newly identified file to an episode of a known show.
    ///
    /// With season details, a missing episode is created from them (or as a
    /// placeholder if the catalog does not list it) and a placeholder episode
    /// is upgraded to its real name. Without details the episode must already
    /// exist.
    pub fn attach_episode_file(
        &self,
        key: SeasonKey,
        episode: u32,
        file: VideoFile,
        meta: Option<&SeasonMetadata>,
    ) -> bool {
        let mut inner = self.inner.lock();
        let file_id = file.id;
        let Some((show, is_current)) = inner.show_mut(key.show_id) else {
            return false;
        };

        if meta.is_none() && show.episode(key.season, episode).is_none() {
            return false;
        }

        let season = show.season_mut(key.season);
        if let Some(meta) = meta {
            meta.fill_season(season);
            match season.episodes.get_mut(&episode) {
                Some(existing) => {
                    meta.upgrade_placeholder(existing);
                }
                None => {
                    season.episodes.insert(episode, meta.make_episode(episode));
                }
            }
        }
        let Some(target) = season.episodes.get_mut(&episode) else {
            return false;
        };
        target.files.push(file);

        if is_current {
            inner.dirty_shows.insert(key.show_id);
        }
        inner.file_index.insert(
            file_id,
            FileOwner::Episode {
                show_id: key.show_id,
                season: key.season,
                episode,
            },
        );
        true
    }

    // ---------------------------------------------------------------------
    // Refresh pass
    // ---------------------------------------------------------------------

    /// Apply refreshed details to a persisted movie and mark it dirty.
    pub fn refresh_movie(&self, meta: &MovieMetadata) {
        let mut inner = self.inner.lock();
        if let Some(movie) = inner.current_movies.get_mut(&meta.id) {
            meta.refresh(movie);
            inner.dirty_movies.insert(meta.id);
        }
    }

    /// Apply refreshed show and season details to a persisted show and mark
    /// it dirty.
    pub fn refresh_show(&self, meta: &ShowMetadata, seasons: &[Arc<SeasonMetadata>]) {
        let mut inner = self.inner.lock();
        if let Some(show) = inner.current_shows.get_mut(&meta.id) {
            meta.refresh(show);
            for season_meta in seasons {
                if let Some(season) = show.seasons.get_mut(&season_meta.number) {
                    season_meta.refresh(season);
                }
            }
            inner.dirty_shows.insert(meta.id);
        }
    }
}
