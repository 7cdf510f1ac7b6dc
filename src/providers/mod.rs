//! Upstream provider integrations.
//!
//! Defines the `GeocodeResolver` and `ForecastFetcher` traits and the
//! Open-Meteo implementations of both. The orchestrator depends only on
//! the traits, so tests substitute deterministic in-memory providers.

pub mod open_meteo;

use async_trait::async_trait;

use crate::types::{GeoCandidate, WeatherError};

pub use open_meteo::{OpenMeteoForecast, OpenMeteoGeocoder, RawCurrent, RawDaily, RawForecastPayload};

/// Converts a free-text query into one candidate location.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeocodeResolver: Send + Sync {
    /// Resolve a query to the provider's top-ranked candidate.
    ///
    /// Fails with `EmptyQuery` before any network call when the query is
    /// blank, `NoMatch` when the provider answers with zero candidates,
    /// and `UpstreamUnavailable` on transport failure.
    async fn resolve(&self, query: &str) -> Result<GeoCandidate, WeatherError>;
}

/// Retrieves current + 7-day daily data for a coordinate pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ForecastFetcher: Send + Sync {
    /// Fetch the raw provider payload for the given coordinates.
    ///
    /// Coordinates are passed through unvalidated; the provider rejects
    /// malformed values and that surfaces as `UpstreamUnavailable` or
    /// `UpstreamMalformed`. Exactly one round trip, no retries.
    async fn fetch(&self, latitude: f64, longitude: f64)
        -> Result<RawForecastPayload, WeatherError>;
}
