//! Resolution orchestration.
//!
//! Composes geocoding, forecast fetching, normalization, and the
//! favorite store into the two request flows:
//!
//! - ad-hoc resolution of coordinates or a free-text query;
//! - favorite add/list/get/remove, where forecasts are re-resolved from
//!   the stored coordinates on every read (no caching).
//!
//! Per-favorite forecast failures are isolated: the favorite is still
//! returned with `forecast: None` and the failure is logged.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{info, warn};

use crate::normalize::normalize;
use crate::providers::{ForecastFetcher, GeocodeResolver};
use crate::store::FavoriteStore;
use crate::types::{FavoriteLocation, FavoriteWithForecast, ForecastSnapshot, WeatherError};

/// Ad-hoc resolution input. Coordinates take precedence over the query
/// when both are present.
#[derive(Debug, Clone, Default)]
pub struct ResolveRequest {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub query: Option<String>,
}

/// Composes the resolution pipeline. Holds no per-request state; the
/// requesting user is always an explicit parameter.
pub struct ResolutionOrchestrator {
    geocoder: Arc<dyn GeocodeResolver>,
    fetcher: Arc<dyn ForecastFetcher>,
    store: FavoriteStore,
    /// Fan-out width for per-favorite forecast fetches when listing.
    fetch_concurrency: usize,
}

impl ResolutionOrchestrator {
    pub fn new(
        geocoder: Arc<dyn GeocodeResolver>,
        fetcher: Arc<dyn ForecastFetcher>,
        store: FavoriteStore,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            geocoder,
            fetcher,
            store,
            fetch_concurrency: fetch_concurrency.max(1),
        }
    }

    // -- Ad-hoc resolution -----------------------------------------------

    /// Resolve a query or coordinate pair to a forecast snapshot.
    ///
    /// With coordinates, any query text present doubles as the display
    /// name. Query-only requests geocode first; geocoding failures
    /// short-circuit. Neither input is `MissingInput`.
    pub async fn resolve(&self, req: &ResolveRequest) -> Result<ForecastSnapshot, WeatherError> {
        match (req.latitude, req.longitude) {
            (Some(lat), Some(lon)) => {
                info!(lat, lon, "Resolving forecast for explicit coordinates");
                self.fetch_snapshot(lat, lon, req.query.as_deref()).await
            }
            _ => {
                let query = req
                    .query
                    .as_deref()
                    .filter(|q| !q.trim().is_empty())
                    .ok_or(WeatherError::MissingInput)?;

                let candidate = self.geocoder.resolve(query).await?;
                info!(query, %candidate, "Geocoded query, fetching forecast");
                self.fetch_snapshot(candidate.latitude, candidate.longitude, Some(&candidate.name))
                    .await
            }
        }
    }

    async fn fetch_snapshot(
        &self,
        latitude: f64,
        longitude: f64,
        name: Option<&str>,
    ) -> Result<ForecastSnapshot, WeatherError> {
        let raw = self.fetcher.fetch(latitude, longitude).await?;
        Ok(normalize(&raw, name))
    }

    // -- Favorites ---------------------------------------------------------

    /// Geocode `name`, dedup against the user's stored coordinates, and
    /// persist. The attached forecast is best-effort: a fetch failure
    /// leaves it `None` without undoing the add.
    pub async fn add_favorite(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<FavoriteWithForecast, WeatherError> {
        let candidate = self.geocoder.resolve(name).await?;
        info!(user_id, name, %candidate, "Geocoded favorite candidate");

        let favorite = self.store.add(user_id, &candidate).await?;
        let forecast = self.forecast_for(&favorite).await;
        Ok(FavoriteWithForecast::new(favorite, forecast))
    }

    /// All favorites for a user, each with a freshly resolved forecast.
    ///
    /// Fetches run concurrently up to the configured width; `buffered`
    /// yields results in input order, so the stored ordering survives.
    pub async fn list_favorites(
        &self,
        user_id: i64,
    ) -> Result<Vec<FavoriteWithForecast>, WeatherError> {
        let favorites = self.store.list(user_id).await?;
        info!(user_id, count = favorites.len(), "Listing favorite locations");

        let resolved = stream::iter(favorites)
            .map(|favorite| async move {
                let forecast = self.forecast_for(&favorite).await;
                FavoriteWithForecast::new(favorite, forecast)
            })
            .buffered(self.fetch_concurrency)
            .collect::<Vec<_>>()
            .await;

        Ok(resolved)
    }

    /// One favorite with a fresh forecast. `NotFound` covers both absent
    /// rows and rows owned by another user.
    pub async fn get_favorite(
        &self,
        user_id: i64,
        id: &str,
    ) -> Result<FavoriteWithForecast, WeatherError> {
        let favorite = self.store.get(user_id, id).await?;
        let forecast = self.forecast_for(&favorite).await;
        Ok(FavoriteWithForecast::new(favorite, forecast))
    }

    /// Remove a favorite; returns the removed row for response messages.
    pub async fn remove_favorite(
        &self,
        user_id: i64,
        id: &str,
    ) -> Result<FavoriteLocation, WeatherError> {
        self.store.remove(user_id, id).await
    }

    /// Best-effort forecast for a stored favorite: the stored name is
    /// passed through so the snapshot keeps the canonical display name.
    async fn forecast_for(&self, favorite: &FavoriteLocation) -> Option<ForecastSnapshot> {
        match self
            .fetch_snapshot(favorite.latitude, favorite.longitude, Some(&favorite.name))
            .await
        {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(
                    id = %favorite.id,
                    name = %favorite.name,
                    error = %e,
                    "Forecast fetch failed for favorite, returning it without one"
                );
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
