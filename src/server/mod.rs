//! HTTP API — Axum web server.
//!
//! Thin transport layer over the resolution orchestrator. Routing,
//! response envelopes, and status-code mapping only; all pipeline logic
//! lives below this module. CORS enabled for local development.
//!
//! Authentication is an external boundary: the gateway in front of this
//! service validates credentials and injects the authenticated user id
//! as the `x-user-id` header.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::AppState;

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, routes::USER_ID_HEADER]);

    Router::new()
        .route("/api/weather", get(routes::get_weather))
        .route("/api/favorites", post(routes::add_favorite))
        .route("/api/favorites", get(routes::list_favorites))
        .route("/api/favorites/:id", get(routes::get_favorite))
        .route("/api/favorites/:id", axum::routing::delete(routes::remove_favorite))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until shutdown resolves.
pub async fn serve(
    state: AppState,
    port: u16,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "API server starting on http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind API port")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")
}
