//! End-of-scan reconciliation.
//!
//! The walk leaves its results in [`ScanInner`]. Reconciliation prunes files
//! that were not seen, computes the complete write-set and commits it in one
//! store transaction. Ratings are refreshed afterwards in a separate,
//! best-effort step.

use std::collections::{BTreeMap, HashSet};

use cinedex_common::{MovieId, Result, ShowId};
use cinedex_db::models::{Movie, Show};
use cinedex_db::store::LibraryStore;
use tracing::{debug, info};

use super::state::ScanInner;
use crate::ratings::{RatingsProgress, RatingsStore};

/// What a reconciliation wrote.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ReconcileStats {
    pub new_movies: usize,
    pub new_shows: usize,
    pub saved_movies: usize,
    pub saved_shows: usize,
    pub unscanned: usize,
    pub pruned_files: usize,
    pub deleted_movies: usize,
    pub deleted_shows: usize,
}

/// The library after a successful reconciliation.
pub(crate) struct Reconciled {
    /// Every movie and show that still has files.
    pub movies: BTreeMap<MovieId, Movie>,
    pub shows: BTreeMap<ShowId, Show>,
    /// IMDb ids of entities first added by this scan.
    pub new_imdb_ids: HashSet<String>,
    pub stats: ReconcileStats,
}

/// Prune, save and garbage-collect in one transaction.
///
/// On error nothing has been written.
pub(crate) fn reconcile(inner: ScanInner, store: &dyn LibraryStore) -> Result<Reconciled> {
    let ScanInner {
        mut current_movies,
        mut current_shows,
        new_movies,
        new_shows,
        found_files,
        mut dirty_movies,
        mut dirty_shows,
        mut unscanned,
        ..
    } = inner;

    let mut stats = ReconcileStats::default();

    // Files not seen this scan are gone or unreachable.
    for movie in current_movies.values_mut() {
        let removed = movie.retain_files(|f| found_files.contains(&f.id));
        if removed > 0 {
            stats.pruned_files += removed;
            dirty_movies.insert(movie.id);
        }
    }
    for show in current_shows.values_mut() {
        let removed = show.retain_files(|f| found_files.contains(&f.id));
        if removed > 0 {
            stats.pruned_files += removed;
            dirty_shows.insert(show.id);
        }
    }

    // Persisted entities take precedence over a same-id discovery.
    let new_movies: BTreeMap<_, _> = new_movies
        .into_iter()
        .filter(|(id, m)| !current_movies.contains_key(id) && !m.files.is_empty())
        .collect();
    let new_shows: BTreeMap<_, _> = new_shows
        .into_iter()
        .filter(|(id, s)| !current_shows.contains_key(id) && !s.is_empty())
        .collect();
    let dirty_movies: Vec<&Movie> = dirty_movies
        .iter()
        .filter_map(|id| current_movies.get(id))
        .collect();
    let dirty_shows: Vec<&Show> = dirty_shows
        .iter()
        .filter_map(|id| current_shows.get(id))
        .collect();

    unscanned.sort_by(|a, b| {
        (a.source_id.as_str(), a.file_path.as_str()).cmp(&(b.source_id.as_str(), b.file_path.as_str()))
    });

    stats.new_movies = new_movies.len();
    stats.new_shows = new_shows.len();
    stats.saved_movies = new_movies.len() + dirty_movies.len();
    stats.saved_shows = new_shows.len() + dirty_shows.len();
    stats.unscanned = unscanned.len();

    let mut deleted_movies = 0;
    let mut deleted_shows = 0;
    store.transaction(&mut |w| {
        for movie in new_movies.values().chain(dirty_movies.iter().copied()) {
            w.save_movie(movie)?;
        }
        for show in new_shows.values().chain(dirty_shows.iter().copied()) {
            w.save_show(show)?;
        }
        w.set_unscanned_files(&unscanned)?;
        deleted_movies = w.delete_empty_movies()?;
        deleted_shows = w.delete_empty_shows()?;
        Ok(())
    })?;
    stats.deleted_movies = deleted_movies;
    stats.deleted_shows = deleted_shows;

    info!(
        new_movies = stats.new_movies,
        new_shows = stats.new_shows,
        saved_movies = stats.saved_movies,
        saved_shows = stats.saved_shows,
        pruned_files = stats.pruned_files,
        unscanned = stats.unscanned,
        deleted_movies,
        deleted_shows,
        "Library reconciled"
    );

    let new_imdb_ids = new_movies
        .values()
        .filter_map(|m| m.imdb_id.clone())
        .chain(new_shows.values().filter_map(|s| s.imdb_id.clone()))
        .collect();

    let mut movies: BTreeMap<_, _> = current_movies
        .into_iter()
        .filter(|(_, m)| !m.files.is_empty())
        .collect();
    movies.extend(new_movies);
    let mut shows: BTreeMap<_, _> = current_shows
        .into_iter()
        .filter(|(_, s)| !s.is_empty())
        .collect();
    shows.extend(new_shows);

    Ok(Reconciled {
        movies,
        shows,
        new_imdb_ids,
        stats,
    })
}

/// Refresh external ratings and re-save entities whose rating changed.
///
/// Covers entities added by this scan, or every entity when `all` is set.
/// Runs in its own transaction; a failure here leaves the reconciled library
/// untouched. Returns how many entities were updated.
pub(crate) async fn backfill_ratings(
    store: &dyn LibraryStore,
    ratings: &dyn RatingsStore,
    library: &mut Reconciled,
    all: bool,
    on_progress: &RatingsProgress<'_>,
) -> anyhow::Result<usize> {
    let mut ids = library.new_imdb_ids.clone();
    if all {
        ids.extend(library.movies.values().filter_map(|m| m.imdb_id.clone()));
        ids.extend(library.shows.values().filter_map(|s| s.imdb_id.clone()));
    }
    if ids.is_empty() {
        debug!("No external ids to refresh ratings for");
        return Ok(0);
    }

    ratings.bulk_refresh(&ids, Some(on_progress)).await?;

    let mut changed_movies = Vec::new();
    for movie in library.movies.values_mut() {
        let Some(imdb_id) = movie.imdb_id.as_deref().filter(|id| ids.contains(*id)) else {
            continue;
        };
        if let Some(rating) = ratings.lookup(imdb_id)? {
            if movie.external_rating != Some(rating) {
                movie.external_rating = Some(rating);
                changed_movies.push(movie.id);
            }
        }
    }
    let mut changed_shows = Vec::new();
    for show in library.shows.values_mut() {
        let Some(imdb_id) = show.imdb_id.as_deref().filter(|id| ids.contains(*id)) else {
            continue;
        };
        if let Some(rating) = ratings.lookup(imdb_id)? {
            if show.external_rating != Some(rating) {
                show.external_rating = Some(rating);
                changed_shows.push(show.id);
            }
        }
    }

    let updated = changed_movies.len() + changed_shows.len();
    if updated == 0 {
        return Ok(0);
    }

    store.transaction(&mut |w| {
        for id in &changed_movies {
            if let Some(movie) = library.movies.get(id) {
                w.save_movie(movie)?;
            }
        }
        for id in &changed_shows {
            if let Some(show) = library.shows.get(id) {
                w.save_show(show)?;
            }
        }
        Ok(())
    })?;

    info!(updated, "Updated external ratings");
    Ok(updated)
}
