//! Identification of newly discovered files.
//!
//! Each file is classified by name, searched in the catalog and attached to
//! the matching movie or episode. Entity and season details are fetched
//! through the pending-fetch maps in [`ScanState`] so concurrent files that
//! resolve to the same entity share one request.

use std::sync::Arc;

use cinedex_common::{MovieId, SeasonKey, ShowId};
use cinedex_db::models::VideoFile;
use cinedex_parser::{classify, CleanedTitle, MediaGuess, ParsedEpisode};
use futures::FutureExt;
use tracing::{debug, warn};

use super::state::{Lookup, ScanState, SeasonLookup};
use crate::catalog::{CatalogError, CatalogGateway, CatalogResult, SearchCandidate, SeasonMetadata};

/// Pick the show search result to use for a file.
///
/// With a file year, the first candidate (in catalog order) that first aired
/// no later than that year wins. Release years on TV files often reflect the
/// encode rather than the premiere, so later candidates are skipped rather
/// than preferred. Without a year, or when nothing qualifies, the first
/// candidate is used.
pub fn find_best_match(candidates: &[SearchCandidate], year: Option<u16>) -> Option<&SearchCandidate> {
    if let Some(year) = year {
        if let Some(candidate) = candidates
            .iter()
            .find(|c| c.year.is_some_and(|first_aired| first_aired <= year))
        {
            return Some(candidate);
        }
    }
    candidates.first()
}

/// Why a file ended up unscanned.
#[derive(Debug)]
enum Unmatched {
    NoResults,
    Catalog(CatalogError),
    Missing,
}

impl std::fmt::Display for Unmatched {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoResults => f.write_str("no catalog results"),
            Self::Catalog(e) => write!(f, "{e}"),
            Self::Missing => f.write_str("matched entity disappeared"),
        }
    }
}

impl From<CatalogError> for Unmatched {
    fn from(err: CatalogError) -> Self {
        Self::Catalog(err)
    }
}

/// Matches files against the catalog for one scan.
pub(crate) struct Resolver {
    gateway: Arc<CatalogGateway>,
}

impl Resolver {
    pub fn new(gateway: Arc<CatalogGateway>) -> Self {
        Self { gateway }
    }

    /// Identify `file` and attach it to its entity, or record it as
    /// unscanned.
    pub async fn resolve(&self, state: &ScanState, file: VideoFile) {
        let result = match classify(&file.name) {
            MediaGuess::Episode(parsed) => self.resolve_episode(state, &parsed, &file).await,
            MediaGuess::Movie(parsed) => self.resolve_movie(state, &parsed, &file).await,
        };

        if let Err(reason) = result {
            warn!(path = %file.file_path, source_id = %file.source_id, reason = %reason, "Could not match file");
            state.add_unscanned(file);
        }
    }

    async fn resolve_movie(
        &self,
        state: &ScanState,
        parsed: &CleanedTitle,
        file: &VideoFile,
    ) -> Result<(), Unmatched> {
        if parsed.title.is_empty() {
            return Err(Unmatched::NoResults);
        }

        let candidates = self.gateway.search_movie(&parsed.title, parsed.year).await?;
        // Movie files carry a reliable year that already narrowed the search,
        // so the catalog's top result is taken as is.
        let id = MovieId::new(candidates.first().ok_or(Unmatched::NoResults)?.id);

        self.ensure_movie(state, id).await?;
        debug!(path = %file.file_path, movie_id = %id, "Matched movie");
        if state.attach_movie_file(id, file.clone()) {
            Ok(())
        } else {
            Err(Unmatched::Missing)
        }
    }

    async fn ensure_movie(&self, state: &ScanState, id: MovieId) -> CatalogResult<()> {
        let gateway = self.gateway.clone();
        let lookup = state.movie_lookup(id, move || {
            async move { gateway.movie_details(id).await.map(Arc::new) }.boxed()
        });

        if let Lookup::Fetch(fetch) = lookup {
            let result = fetch.clone().await;
            state.settle_movie(id, &fetch, &result);
            result?;
        }
        Ok(())
    }

    async fn resolve_episode(
        &self,
        state: &ScanState,
        parsed: &ParsedEpisode,
        file: &VideoFile,
    ) -> Result<(), Unmatched> {
        // Years on later seasons are unreliable for filtering the search.
        let search_year = if parsed.season == 1 { parsed.year } else { None };
        let candidates = self
            .gateway
            .search_show(&parsed.show_title, search_year)
            .await?;
        let best = find_best_match(&candidates, parsed.year).ok_or(Unmatched::NoResults)?;
        let show_id = ShowId::new(best.id);

        self.ensure_show(state, show_id).await?;

        let key = SeasonKey {
            show_id,
            season: parsed.season,
        };
        let season = if state.needs_season(key, parsed.episode) {
            Some(self.season(state, key).await?)
        } else {
            None
        };

        debug!(
            path = %file.file_path,
            show_id = %show_id,
            season = parsed.season,
            episode = parsed.episode,
            "Matched episode"
        );
        if state.attach_episode_file(key, parsed.episode, file.clone(), season.as_deref()) {
            Ok(())
        } else {
            Err(Unmatched::Missing)
        }
    }

    async fn ensure_show(&self, state: &ScanState, id: ShowId) -> CatalogResult<()> {
        let gateway = self.gateway.clone();
        let lookup = state.show_lookup(id, move || {
            async move { gateway.show_details(id).await.map(Arc::new) }.boxed()
        });

        if let Lookup::Fetch(fetch) = lookup {
            let result = fetch.clone().await;
            state.settle_show(id, &fetch, &result);
            result?;
        }
        Ok(())
    }

    async fn season(&self, state: &ScanState, key: SeasonKey) -> CatalogResult<Arc<SeasonMetadata>> {
        let gateway = self.gateway.clone();
        let lookup = state.season_lookup(key, move || {
            async move {
                gateway
                    .season_details(key.show_id, key.season)
                    .await
                    .map(Arc::new)
            }
            .boxed()
        });

        match lookup {
            SeasonLookup::Cached(season) => Ok(season),
            SeasonLookup::Fetch(fetch) => {
                let result = fetch.clone().await;
                state.settle_season(key, &fetch, &result);
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u64, year: Option<u16>) -> SearchCandidate {
        SearchCandidate {
            id,
            title: format!("Show {id}"),
            year,
            overview: None,
            poster_path: None,
        }
    }

    #[test]
    fn test_best_match_keeps_catalog_order() {
        let candidates = vec![
            candidate(1, Some(2015)),
            candidate(2, Some(2010)),
            candidate(3, Some(2021)),
        ];
        assert_eq!(find_best_match(&candidates, Some(2012)).map(|c| c.id), Some(2));
    }

    #[test]
    fn test_best_match_falls_back_to_first() {
        let candidates = vec![candidate(1, Some(2015)), candidate(2, None)];
        assert_eq!(find_best_match(&candidates, Some(2001)).map(|c| c.id), Some(1));
        assert_eq!(find_best_match(&candidates, None).map(|c| c.id), Some(1));
        assert!(find_best_match(&[], Some(2001)).is_none());
    }

    #[test]
    fn test_best_match_accepts_same_year() {
        let candidates = vec![candidate(1, Some(2021)), candidate(2, Some(2012))];
        assert_eq!(find_best_match(&candidates, Some(2012)).map(|c| c.id), Some(2));
    }
}
