//! Forecast normalization.
//!
//! Maps the raw Open-Meteo payload into the internal `ForecastSnapshot`,
//! substituting a human-readable description for WMO weather codes and
//! tolerating missing or misaligned per-day arrays. Partial upstream data
//! never fails the whole request: an inconsistent day is dropped with a
//! diagnostic, everything else survives in order.

use tracing::warn;

use crate::providers::{RawDaily, RawForecastPayload};
use crate::types::{CurrentConditions, DailyConditions, ForecastSnapshot};

/// Normalize a raw provider payload into a `ForecastSnapshot`.
///
/// Location name resolution order:
/// 1. `explicit_name`, when non-empty;
/// 2. the segment after the last `/` of the payload's timezone
///    ("Europe/Rome" → "Rome") — raw coordinate requests carry no
///    canonical name;
/// 3. empty string.
pub fn normalize(raw: &RawForecastPayload, explicit_name: Option<&str>) -> ForecastSnapshot {
    let location_name = resolve_location_name(explicit_name, &raw.timezone);

    let current = raw.current.as_ref().map(|c| CurrentConditions {
        time: c.time.clone(),
        temperature: c.temperature_2m,
        apparent_temperature: c.apparent_temperature,
        relative_humidity: c.relative_humidity_2m,
        precipitation: c.precipitation,
        weather_code: c.weather_code,
        weather_description: describe_weather_code(c.weather_code).to_string(),
        wind_speed: c.wind_speed_10m,
    });

    let daily = raw
        .daily
        .as_ref()
        .map(|d| normalize_daily(d, raw.latitude, raw.longitude))
        .unwrap_or_default();

    ForecastSnapshot {
        location_name,
        latitude: raw.latitude,
        longitude: raw.longitude,
        timezone: raw.timezone.clone(),
        current,
        daily,
    }
}

fn resolve_location_name(explicit_name: Option<&str>, timezone: &str) -> String {
    if let Some(name) = explicit_name {
        if !name.trim().is_empty() {
            return name.to_string();
        }
    }
    timezone
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Build the daily sequence, keeping a day only when every required
/// parallel array has an entry at that index. The precipitation
/// probability array is allowed to run short; a missing entry becomes
/// `None` rather than dropping the day.
fn normalize_daily(daily: &RawDaily, latitude: f64, longitude: f64) -> Vec<DailyConditions> {
    let mut out = Vec::with_capacity(daily.time.len());

    for (i, date) in daily.time.iter().enumerate() {
        let required = (
            daily.temperature_2m_max.get(i),
            daily.temperature_2m_min.get(i),
            daily.apparent_temperature_max.get(i),
            daily.apparent_temperature_min.get(i),
            daily.weather_code.get(i),
            daily.sunrise.get(i),
            daily.sunset.get(i),
            daily.precipitation_sum.get(i),
            daily.wind_speed_10m_max.get(i),
        );

        let (
            Some(&temperature_max),
            Some(&temperature_min),
            Some(&apparent_temperature_max),
            Some(&apparent_temperature_min),
            Some(&weather_code),
            Some(sunrise),
            Some(sunset),
            Some(&precipitation_sum),
            Some(&wind_speed_max),
        ) = required
        else {
            warn!(
                index = i,
                lat = latitude,
                lon = longitude,
                "Daily array length mismatch, dropping day"
            );
            continue;
        };

        out.push(DailyConditions {
            date: date.clone(),
            temperature_max,
            temperature_min,
            apparent_temperature_max,
            apparent_temperature_min,
            weather_code,
            weather_description: describe_weather_code(weather_code).to_string(),
            sunrise: sunrise.clone(),
            sunset: sunset.clone(),
            precipitation_sum,
            precipitation_probability_max: daily
                .precipitation_probability_max
                .get(i)
                .copied()
                .flatten(),
            wind_speed_max,
        });
    }

    out
}

/// WMO weather code → human-readable description.
///
/// Total lookup with an explicit default; reproduced exactly for output
/// compatibility with downstream consumers.
pub fn describe_weather_code(code: i32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mostly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 => "Fog",
        48 => "Depositing rime fog",
        51 => "Light drizzle",
        53 => "Moderate drizzle",
        55 => "Dense drizzle",
        56 => "Light freezing drizzle",
        57 => "Dense freezing drizzle",
        61 => "Light rain",
        63 => "Moderate rain",
        65 => "Heavy rain",
        66 => "Light freezing rain",
        67 => "Heavy freezing rain",
        71 => "Light snowfall",
        73 => "Moderate snowfall",
        75 => "Heavy snowfall",
        77 => "Snow grains",
        80 => "Light rain showers",
        81 => "Moderate rain showers",
        82 => "Violent rain showers",
        85 => "Light snow showers",
        86 => "Heavy snow showers",
        95 => "Thunderstorm",
        96 => "Thunderstorm with light hail",
        99 => "Thunderstorm with heavy hail",
        _ => "Unavailable",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
