//! Open-Meteo geocoding and forecast clients.
//!
//! Uses the free Open-Meteo APIs (no key required).
//!
//! Geocoding: `https://geocoding-api.open-meteo.com/v1/search`
//! Forecast:  `https://api.open-meteo.com/v1/forecast`
//! Auth: None required.
//! Rate limit: Generous (free tier).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::{ForecastFetcher, GeocodeResolver};
use crate::config::UpstreamConfig;
use crate::types::{GeoCandidate, WeatherError};

const USER_AGENT: &str = "nimbus/0.1.0";

/// Current-conditions fields requested from the forecast endpoint.
const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,weather_code,wind_speed_10m";

/// Daily fields requested from the forecast endpoint.
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,\
apparent_temperature_max,apparent_temperature_min,sunrise,sunset,\
precipitation_sum,precipitation_probability_max,wind_speed_10m_max";

/// Forecast horizon in days. Fixed by the pipeline contract.
const FORECAST_DAYS: u8 = 7;

// ---------------------------------------------------------------------------
// Wire types — geocoding
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    country: String,
    /// Region or state; the provider omits it for some places.
    #[serde(default)]
    admin1: Option<String>,
}

impl From<GeocodingResult> for GeoCandidate {
    fn from(r: GeocodingResult) -> Self {
        GeoCandidate {
            name: r.name,
            latitude: r.latitude,
            longitude: r.longitude,
            country: r.country,
            region: r.admin1,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types — forecast
// ---------------------------------------------------------------------------

/// Raw forecast payload as returned by the provider.
///
/// Everything is `#[serde(default)]`-tolerant: partial responses decode
/// and the normalizer decides what survives.
#[derive(Debug, Clone, Deserialize)]
pub struct RawForecastPayload {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub timezone: String,
    /// Answered under `current` for `current=` requests; older payloads
    /// used `current_weather`.
    #[serde(default, alias = "current_weather")]
    pub current: Option<RawCurrent>,
    #[serde(default)]
    pub daily: Option<RawDaily>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCurrent {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub temperature_2m: f64,
    #[serde(default)]
    pub relative_humidity_2m: i32,
    #[serde(default)]
    pub apparent_temperature: f64,
    #[serde(default)]
    pub precipitation: f64,
    #[serde(default)]
    pub weather_code: i32,
    #[serde(default)]
    pub wind_speed_10m: f64,
}

/// Parallel per-day arrays keyed by index into `time`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDaily {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub weather_code: Vec<i32>,
    #[serde(default)]
    pub temperature_2m_max: Vec<f64>,
    #[serde(default)]
    pub temperature_2m_min: Vec<f64>,
    #[serde(default)]
    pub apparent_temperature_max: Vec<f64>,
    #[serde(default)]
    pub apparent_temperature_min: Vec<f64>,
    #[serde(default)]
    pub sunrise: Vec<String>,
    #[serde(default)]
    pub sunset: Vec<String>,
    #[serde(default)]
    pub precipitation_sum: Vec<f64>,
    /// May be shorter than the other arrays, and entries may be null.
    #[serde(default)]
    pub precipitation_probability_max: Vec<Option<i32>>,
    #[serde(default)]
    pub wind_speed_10m_max: Vec<f64>,
}

// ---------------------------------------------------------------------------
// Shared client plumbing
// ---------------------------------------------------------------------------

fn build_http(cfg: &UpstreamConfig) -> Result<Client, WeatherError> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| WeatherError::UpstreamUnavailable(e.to_string()))
}

/// Map a transport-level reqwest failure into the domain taxonomy.
fn transport_error(e: reqwest::Error) -> WeatherError {
    if e.is_timeout() {
        WeatherError::UpstreamUnavailable("request timed out".into())
    } else {
        WeatherError::UpstreamUnavailable(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Geocoding client
// ---------------------------------------------------------------------------

/// Open-Meteo geocoding client. Always takes the provider's first
/// (best-ranked) candidate; upstream order is authoritative.
pub struct OpenMeteoGeocoder {
    http: Client,
    base_url: String,
    language: String,
}

impl OpenMeteoGeocoder {
    pub fn new(cfg: &UpstreamConfig) -> Result<Self, WeatherError> {
        Ok(Self {
            http: build_http(cfg)?,
            base_url: cfg.geocoding_url.clone(),
            language: cfg.language.clone(),
        })
    }
}

#[async_trait]
impl GeocodeResolver for OpenMeteoGeocoder {
    async fn resolve(&self, query: &str) -> Result<GeoCandidate, WeatherError> {
        if query.trim().is_empty() {
            return Err(WeatherError::EmptyQuery);
        }

        let url = format!(
            "{}?name={}&count=1&language={}&format=json",
            self.base_url,
            urlencoding::encode(query),
            self.language,
        );
        debug!(url = %url, "Geocoding query");

        let resp = self.http.get(&url).send().await.map_err(|e| {
            error!(query, error = %e, "Geocoding request failed");
            transport_error(e)
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            error!(query, %status, "Geocoding API error");
            return Err(WeatherError::UpstreamUnavailable(format!(
                "geocoding API returned {status}"
            )));
        }

        let body: GeocodingResponse = resp
            .json()
            .await
            .map_err(|e| WeatherError::UpstreamMalformed(e.to_string()))?;

        match body.results.and_then(|mut r| {
            if r.is_empty() {
                None
            } else {
                Some(r.remove(0))
            }
        }) {
            Some(best) => {
                debug!(query, name = %best.name, lat = best.latitude, lon = best.longitude,
                    "Geocoding hit");
                Ok(best.into())
            }
            None => {
                warn!(query, "Geocoding returned zero candidates");
                Err(WeatherError::NoMatch(query.to_string()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Forecast client
// ---------------------------------------------------------------------------

/// Open-Meteo forecast client. One round trip per resolution: current
/// conditions plus a 7-day daily horizon, provider-local timezone.
pub struct OpenMeteoForecast {
    http: Client,
    base_url: String,
}

impl OpenMeteoForecast {
    pub fn new(cfg: &UpstreamConfig) -> Result<Self, WeatherError> {
        Ok(Self {
            http: build_http(cfg)?,
            base_url: cfg.forecast_url.clone(),
        })
    }
}

#[async_trait]
impl ForecastFetcher for OpenMeteoForecast {
    async fn fetch(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<RawForecastPayload, WeatherError> {
        let url = format!(
            "{}?latitude={latitude}&longitude={longitude}\
             &current={CURRENT_FIELDS}&daily={DAILY_FIELDS}\
             &timezone=auto&forecast_days={FORECAST_DAYS}",
            self.base_url,
        );
        debug!(lat = latitude, lon = longitude, "Fetching forecast");

        let resp = self.http.get(&url).send().await.map_err(|e| {
            error!(lat = latitude, lon = longitude, error = %e, "Forecast request failed");
            transport_error(e)
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            error!(lat = latitude, lon = longitude, %status, "Forecast API error");
            return Err(WeatherError::UpstreamUnavailable(format!(
                "forecast API returned {status}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| WeatherError::UpstreamMalformed(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;

    #[test]
    fn test_geocoding_result_into_candidate() {
        let r = GeocodingResult {
            name: "Roma".into(),
            latitude: 41.89193,
            longitude: 12.51133,
            country: "Italia".into(),
            admin1: Some("Lazio".into()),
        };
        let c: GeoCandidate = r.into();
        assert_eq!(c.name, "Roma");
        assert_eq!(c.region.as_deref(), Some("Lazio"));
    }

    #[test]
    fn test_geocoding_response_decodes_without_results() {
        let body: GeocodingResponse =
            serde_json::from_str(r#"{"generationtime_ms":0.5}"#).unwrap();
        assert!(body.results.is_none());
    }

    #[test]
    fn test_raw_payload_decodes_partial_daily() {
        let json = r#"{
            "latitude": 41.875,
            "longitude": 12.5,
            "timezone": "Europe/Rome",
            "daily": {
                "time": ["2026-08-28", "2026-08-29"],
                "temperature_2m_max": [31.0]
            }
        }"#;
        let payload: RawForecastPayload = serde_json::from_str(json).unwrap();
        assert!(payload.current.is_none());
        let daily = payload.daily.unwrap();
        assert_eq!(daily.time.len(), 2);
        assert_eq!(daily.temperature_2m_max.len(), 1);
        assert!(daily.sunrise.is_empty());
    }

    #[test]
    fn test_raw_payload_accepts_legacy_current_key() {
        let json = r#"{
            "timezone": "Europe/Rome",
            "current_weather": {"time": "2026-08-28T12:00", "temperature_2m": 29.5}
        }"#;
        let payload: RawForecastPayload = serde_json::from_str(json).unwrap();
        let current = payload.current.unwrap();
        assert_eq!(current.temperature_2m, 29.5);
        // Unrequested fields default
        assert_eq!(current.weather_code, 0);
    }

    #[test]
    fn test_raw_daily_probability_allows_nulls() {
        let json = r#"{"time": ["2026-08-28"], "precipitation_probability_max": [null]}"#;
        let daily: RawDaily = serde_json::from_str(json).unwrap();
        assert_eq!(daily.precipitation_probability_max, vec![None]);
    }

    #[tokio::test]
    async fn test_empty_query_short_circuits_without_network() {
        // Unroutable base URL: if the guard let the request through the
        // client would error differently (or hang until timeout).
        let cfg = UpstreamConfig {
            geocoding_url: "http://192.0.2.1/v1/search".into(),
            timeout_secs: 1,
            ..UpstreamConfig::default()
        };
        let geocoder = OpenMeteoGeocoder::new(&cfg).unwrap();
        assert!(matches!(
            geocoder.resolve("").await,
            Err(WeatherError::EmptyQuery)
        ));
        assert!(matches!(
            geocoder.resolve("   ").await,
            Err(WeatherError::EmptyQuery)
        ));
    }

    #[test]
    fn test_requested_field_lists_cover_required_daily_arrays() {
        for field in [
            "weather_code",
            "temperature_2m_max",
            "temperature_2m_min",
            "apparent_temperature_max",
            "apparent_temperature_min",
            "sunrise",
            "sunset",
            "precipitation_sum",
            "wind_speed_10m_max",
        ] {
            assert!(DAILY_FIELDS.contains(field), "missing daily field {field}");
        }
        assert!(CURRENT_FIELDS.contains("apparent_temperature"));
    }
}
