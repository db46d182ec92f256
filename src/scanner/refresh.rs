//! Full metadata refresh of the persisted library.
//!
//! Runs before the walk on forced scans. Every movie and show is fetched
//! again and its display fields overwritten; identity and files are left
//! alone. A show is only updated when its details and every one of its
//! seasons were fetched, so a partial failure never leaves it half refreshed.

use std::sync::Arc;

use cinedex_common::{MovieId, SeasonKey, ShowId};
use futures::future::{join_all, try_join_all};
use tracing::{debug, warn};

use super::state::ScanState;
use crate::catalog::{CatalogGateway, CatalogResult, SeasonMetadata, ShowMetadata};

/// Counts of refreshed and failed entities.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RefreshStats {
    pub refreshed: usize,
    pub failed: usize,
}

pub(crate) async fn refresh_library(gateway: &CatalogGateway, state: &ScanState) -> RefreshStats {
    let (movies, shows) = state.current_ids();

    let movie_results = join_all(movies.into_iter().map(|id| refresh_movie(gateway, state, id)));
    let show_results = join_all(
        shows
            .into_iter()
            .map(|(id, seasons)| refresh_show(gateway, state, id, seasons)),
    );
    let (movie_results, show_results) = futures::join!(movie_results, show_results);

    let mut stats = RefreshStats::default();
    for ok in movie_results.into_iter().chain(show_results) {
        if ok {
            stats.refreshed += 1;
        } else {
            stats.failed += 1;
        }
    }
    stats
}

async fn refresh_movie(gateway: &CatalogGateway, state: &ScanState, id: MovieId) -> bool {
    match gateway.movie_details(id).await {
        Ok(meta) => {
            state.refresh_movie(&meta);
            debug!(movie_id = %id, "Refreshed movie");
            true
        }
        Err(e) => {
            warn!(movie_id = %id, error = %e, "Movie refresh failed, keeping stored metadata");
            false
        }
    }
}

async fn refresh_show(
    gateway: &CatalogGateway,
    state: &ScanState,
    id: ShowId,
    seasons: Vec<u32>,
) -> bool {
    match fetch_show(gateway, id, &seasons).await {
        Ok((meta, seasons)) => {
            state.refresh_show(&meta, &seasons);
            for season in seasons {
                state.cache_season(
                    SeasonKey {
                        show_id: id,
                        season: season.number,
                    },
                    season,
                );
            }
            debug!(show_id = %id, "Refreshed show");
            true
        }
        Err(e) => {
            warn!(show_id = %id, error = %e, "Show refresh failed, keeping stored metadata");
            false
        }
    }
}

async fn fetch_show(
    gateway: &CatalogGateway,
    id: ShowId,
    seasons: &[u32],
) -> CatalogResult<(ShowMetadata, Vec<Arc<SeasonMetadata>>)> {
    let meta = gateway.show_details(id).await?;
    let seasons = try_join_all(seasons.iter().map(|&number| async move {
        gateway.season_details(id, number).await.map(Arc::new)
    }))
    .await?;
    Ok((meta, seasons))
}
