//! Shared types for the NIMBUS service.
//!
//! These types form the data model used across all modules.
//! Provider, normalization, store, and server modules depend on them
//! without circular references.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Geocoding
// ---------------------------------------------------------------------------

/// One geocoded location candidate.
///
/// Produced transiently by a `GeocodeResolver`; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoCandidate {
    pub name: String,
    /// Degrees, -90..90
    pub latitude: f64,
    /// Degrees, -180..180
    pub longitude: f64,
    pub country: String,
    /// First-level administrative area (region/state), when known.
    pub region: Option<String>,
}

impl fmt::Display for GeoCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.4}, {:.4}) {}",
            self.name, self.latitude, self.longitude, self.country
        )
    }
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

/// A user-owned, persisted (name, coordinate) pair.
///
/// Invariant: for a given user no two rows share the same exact
/// (latitude, longitude) pair. Checked at add time, not by the schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteLocation {
    /// Opaque identifier (UUID v4 string).
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Owning user. All store operations are scoped to this id.
    pub user_id: i64,
}

/// A favorite together with the forecast resolved for it on this request.
///
/// `forecast` is `None` when the upstream fetch failed; the favorite
/// itself is still returned.
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteWithForecast {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub forecast: Option<ForecastSnapshot>,
}

impl FavoriteWithForecast {
    pub fn new(location: FavoriteLocation, forecast: Option<ForecastSnapshot>) -> Self {
        Self {
            id: location.id,
            name: location.name,
            latitude: location.latitude,
            longitude: location.longitude,
            forecast,
        }
    }
}

// ---------------------------------------------------------------------------
// Forecast snapshot
// ---------------------------------------------------------------------------

/// Normalized forecast for one location.
///
/// Recomputed on every request and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone reported by the provider, e.g. "Europe/Rome".
    pub timezone: String,
    pub current: Option<CurrentConditions>,
    pub daily: Vec<DailyConditions>,
}

/// Point-in-time conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// ISO-8601 local timestamp as reported by the provider.
    pub time: String,
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub relative_humidity: i32,
    pub precipitation: f64,
    pub weather_code: i32,
    pub weather_description: String,
    pub wind_speed: f64,
}

/// One calendar day's summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyConditions {
    pub date: String,
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub apparent_temperature_max: f64,
    pub apparent_temperature_min: f64,
    pub weather_code: i32,
    pub weather_description: String,
    pub sunrise: String,
    pub sunset: String,
    pub precipitation_sum: f64,
    /// May be absent when the provider's probability array is shorter
    /// than the other daily arrays.
    pub precipitation_probability_max: Option<i32>,
    pub wind_speed_max: f64,
}

impl fmt::Display for ForecastSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.4}, {:.4}) [{}]: {} day(s)",
            self.location_name,
            self.latitude,
            self.longitude,
            self.timezone,
            self.daily.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error taxonomy for the resolution pipeline.
///
/// All upstream failures are converted to one of these at the
/// fetch/resolve boundary; raw transport errors never cross it.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Query cannot be empty.")]
    EmptyQuery,

    #[error("No coordinates found for '{0}'.")]
    NoMatch(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Provide either 'latitude' and 'longitude' or a 'query' parameter.")]
    MissingInput,

    #[error("User identity could not be determined.")]
    Unauthorized,

    #[error("Upstream provider unavailable: {0}. Please try again later.")]
    UpstreamUnavailable(String),

    #[error("Malformed upstream response: {0}")]
    UpstreamMalformed(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl WeatherError {
    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WeatherError::UpstreamUnavailable(_))
    }
}

impl From<sqlx::Error> for WeatherError {
    fn from(e: sqlx::Error) -> Self {
        WeatherError::Storage(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> ForecastSnapshot {
        ForecastSnapshot {
            location_name: "Rome".into(),
            latitude: 41.89,
            longitude: 12.48,
            timezone: "Europe/Rome".into(),
            current: None,
            daily: Vec::new(),
        }
    }

    #[test]
    fn test_geo_candidate_display() {
        let c = GeoCandidate {
            name: "Roma".into(),
            latitude: 41.8919,
            longitude: 12.5113,
            country: "Italia".into(),
            region: Some("Lazio".into()),
        };
        let s = format!("{c}");
        assert!(s.contains("Roma"));
        assert!(s.contains("41.8919"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let json = serde_json::to_string(&sample_snapshot()).unwrap();
        assert!(json.contains("\"location_name\":\"Rome\""));
        assert!(json.contains("\"current\":null"));
    }

    #[test]
    fn test_snapshot_roundtrip_keeps_optional_fields() {
        let mut snap = sample_snapshot();
        snap.daily.push(DailyConditions {
            date: "2026-08-28".into(),
            temperature_max: 31.0,
            temperature_min: 21.5,
            apparent_temperature_max: 33.0,
            apparent_temperature_min: 21.0,
            weather_code: 0,
            weather_description: "Clear sky".into(),
            sunrise: "2026-08-28T06:32".into(),
            sunset: "2026-08-28T19:48".into(),
            precipitation_sum: 0.0,
            precipitation_probability_max: None,
            wind_speed_max: 14.2,
        });
        let json = serde_json::to_string(&snap).unwrap();
        let back: ForecastSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.daily.len(), 1);
        assert!(back.daily[0].precipitation_probability_max.is_none());
    }

    #[test]
    fn test_favorite_with_forecast_flattens_location() {
        let fav = FavoriteLocation {
            id: "abc".into(),
            name: "Rome".into(),
            latitude: 41.89,
            longitude: 12.48,
            user_id: 7,
        };
        let with = FavoriteWithForecast::new(fav, Some(sample_snapshot()));
        assert_eq!(with.id, "abc");
        assert!(with.forecast.is_some());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            format!("{}", WeatherError::EmptyQuery),
            "Query cannot be empty."
        );
        let e = WeatherError::NoMatch("Atlantis".into());
        assert!(format!("{e}").contains("Atlantis"));
    }

    #[test]
    fn test_only_upstream_unavailable_is_retryable() {
        assert!(WeatherError::UpstreamUnavailable("timeout".into()).is_retryable());
        assert!(!WeatherError::EmptyQuery.is_retryable());
        assert!(!WeatherError::Conflict("dup".into()).is_retryable());
    }
}
