//! NIMBUS — Location-aware weather forecast service.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! prepares the SQLite store, wires the Open-Meteo providers into the
//! resolution orchestrator, and serves the HTTP API with graceful
//! shutdown.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use nimbus::config::AppConfig;
use nimbus::providers::{OpenMeteoForecast, OpenMeteoGeocoder};
use nimbus::resolve::ResolutionOrchestrator;
use nimbus::server;
use nimbus::server::routes::ServerState;
use nimbus::store::FavoriteStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load_or_default("config.toml")?;

    init_logging();

    info!(
        port = cfg.server.port,
        geocoding = %cfg.upstream.geocoding_url,
        forecast = %cfg.upstream.forecast_url,
        timeout_secs = cfg.upstream.timeout_secs,
        "NIMBUS starting up"
    );

    // -- Storage ----------------------------------------------------------

    let db_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.database.url.clone());
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&db_url)
        .await
        .with_context(|| format!("Failed to open database: {db_url}"))?;

    let store = FavoriteStore::new(pool);
    store
        .migrate()
        .await
        .context("Failed to run database migration")?;

    // -- Pipeline ---------------------------------------------------------

    let geocoder = OpenMeteoGeocoder::new(&cfg.upstream)
        .context("Failed to build geocoding client")?;
    let fetcher = OpenMeteoForecast::new(&cfg.upstream)
        .context("Failed to build forecast client")?;

    let orchestrator = ResolutionOrchestrator::new(
        Arc::new(geocoder),
        Arc::new(fetcher),
        store,
        cfg.favorites.fetch_concurrency,
    );

    let state = Arc::new(ServerState { orchestrator });

    // -- Serve ------------------------------------------------------------

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received.");
    };

    server::serve(state, cfg.server.port, shutdown).await?;

    info!("NIMBUS shut down cleanly.");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("nimbus=info"));

    let json_logging = std::env::var("NIMBUS_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
