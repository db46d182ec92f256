//! Throttled access to a catalog provider.
//!
//! Every scan task calls the catalog through one shared [`CatalogGateway`].
//! The gateway caps the number of requests in flight and enforces a minimum
//! spacing between request starts. Callers queue in arrival order for both.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cinedex_common::{MovieId, ShowId};
use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use tokio::sync::{Mutex, Semaphore};
use tracing::debug;

use super::provider::{
    CatalogError, CatalogProvider, CatalogResult, MovieMetadata, SearchCandidate, SeasonMetadata,
    ShowMetadata,
};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Limits applied by a [`CatalogGateway`].
#[derive(Debug, Clone, Copy)]
pub struct GatewaySettings {
    /// Maximum number of requests in flight at once.
    pub max_concurrent_requests: usize,
    /// Minimum time between two request starts. Zero disables spacing.
    pub min_request_interval: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            min_request_interval: Duration::from_millis(250),
        }
    }
}

/// Queueing, throttling front end for a [`CatalogProvider`].
pub struct CatalogGateway {
    provider: Arc<dyn CatalogProvider>,
    permits: Semaphore,
    /// Held while waiting for the next rate-limit cell so waiters are released
    /// in the order they arrived.
    spacing: Option<Mutex<DirectLimiter>>,
}

impl CatalogGateway {
    pub fn new(provider: Arc<dyn CatalogProvider>, settings: GatewaySettings) -> Self {
        let spacing = Quota::with_period(settings.min_request_interval)
            .map(|quota| Mutex::new(RateLimiter::direct(quota)));

        Self {
            provider,
            permits: Semaphore::new(settings.max_concurrent_requests.max(1)),
            spacing,
        }
    }

    /// Name of the wrapped provider.
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    async fn throttled<T>(&self, call: impl Future<Output = CatalogResult<T>>) -> CatalogResult<T> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CatalogError::Request("catalog gateway closed".to_string()))?;

        if let Some(spacing) = &self.spacing {
            let limiter = spacing.lock().await;
            limiter.until_ready().await;
        }

        call.await
    }

    pub async fn search_movie(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> CatalogResult<Vec<SearchCandidate>> {
        debug!(title, ?year, "Catalog movie search");
        self.throttled(self.provider.search_movie(title, year)).await
    }

    pub async fn search_show(
        &self,
        title: &str,
        year: Option<u16>,
    ) -> CatalogResult<Vec<SearchCandidate>> {
        debug!(title, ?year, "Catalog show search");
        self.throttled(self.provider.search_show(title, year)).await
    }

    pub async fn movie_details(&self, id: MovieId) -> CatalogResult<MovieMetadata> {
        debug!(movie_id = %id, "Catalog movie details");
        self.throttled(self.provider.movie_details(id)).await
    }

    pub async fn show_details(&self, id: ShowId) -> CatalogResult<ShowMetadata> {
        debug!(show_id = %id, "Catalog show details");
        self.throttled(self.provider.show_details(id)).await
    }

    pub async fn season_details(&self, show_id: ShowId, season: u32) -> CatalogResult<SeasonMetadata> {
        debug!(show_id = %show_id, season, "Catalog season details");
        self.throttled(self.provider.season_details(show_id, season))
            .await
    }
}
