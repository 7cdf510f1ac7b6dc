//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has working defaults so the service can start from an
//! empty file; a `.env` file (loaded in `main`) may override the
//! database URL via `DATABASE_URL`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub favorites: FavoritesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Open-Meteo geocoding search endpoint.
    pub geocoding_url: String,
    /// Open-Meteo forecast endpoint.
    pub forecast_url: String,
    /// Client-wide timeout for all upstream calls. The upstream contract
    /// specifies none; expiry surfaces as an unavailable-provider error.
    pub timeout_secs: u64,
    /// Language for geocoded place names.
    pub language: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".into(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".into(),
            timeout_secs: 15,
            language: "en".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://nimbus.db?mode=rwc".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FavoritesConfig {
    /// Maximum concurrent forecast fetches when listing favorites.
    pub fetch_concurrency: usize,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: 4,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(toml::from_str("").context("Failed to build default config")?)
        }
    }
}
