//! API route handlers.
//!
//! All endpoints return a JSON envelope `{success, message, data}`.
//! Failures map onto the pipeline error taxonomy; handlers never panic
//! and never leak raw upstream errors.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::resolve::{ResolutionOrchestrator, ResolveRequest};
use crate::types::{FavoriteWithForecast, ForecastSnapshot, WeatherError};

/// Header carrying the authenticated user id, injected by the gateway.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// Upper bound for favorite location names.
const MAX_NAME_LEN: usize = 200;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct ServerState {
    pub orchestrator: ResolutionOrchestrator,
}

pub type AppState = Arc<ServerState>;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Response envelope carried by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Map a pipeline error onto an HTTP status plus envelope.
fn error_reply<T>(e: &WeatherError) -> (StatusCode, Json<ApiResponse<T>>) {
    let status = match e {
        WeatherError::EmptyQuery | WeatherError::MissingInput => StatusCode::BAD_REQUEST,
        WeatherError::NoMatch(_) | WeatherError::NotFound(_) => StatusCode::NOT_FOUND,
        WeatherError::Conflict(_) => StatusCode::CONFLICT,
        WeatherError::Unauthorized => StatusCode::UNAUTHORIZED,
        WeatherError::UpstreamUnavailable(_) | WeatherError::UpstreamMalformed(_) => {
            StatusCode::BAD_GATEWAY
        }
        WeatherError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::err(e.to_string())))
}

/// Extract the authenticated user id from the gateway header.
fn current_user(headers: &HeaderMap) -> Result<i64, WeatherError> {
    headers
        .get(&USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or(WeatherError::Unauthorized)
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub query: Option<String>,
}

/// GET /api/weather?latitude&longitude&query
pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherQuery>,
) -> (StatusCode, Json<ApiResponse<ForecastSnapshot>>) {
    let req = ResolveRequest {
        latitude: params.latitude,
        longitude: params.longitude,
        query: params.query,
    };

    match state.orchestrator.resolve(&req).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(ApiResponse::ok(snapshot, "Weather data retrieved.")),
        ),
        Err(e) => error_reply(&e),
    }
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AddFavoriteRequest {
    pub name: String,
}

/// POST /api/favorites
pub async fn add_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AddFavoriteRequest>,
) -> (StatusCode, Json<ApiResponse<FavoriteWithForecast>>) {
    let user_id = match current_user(&headers) {
        Ok(id) => id,
        Err(e) => return error_reply(&e),
    };

    let name = body.name.trim();
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(format!(
                "Location name must be 1-{MAX_NAME_LEN} characters."
            ))),
        );
    }

    info!(user_id, name, "Add favorite requested");
    match state.orchestrator.add_favorite(user_id, name).await {
        Ok(favorite) => {
            let message = format!("Location '{}' added to favorites.", favorite.name);
            (StatusCode::CREATED, Json(ApiResponse::ok(favorite, message)))
        }
        Err(e) => error_reply(&e),
    }
}

/// GET /api/favorites
pub async fn list_favorites(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> (StatusCode, Json<ApiResponse<Vec<FavoriteWithForecast>>>) {
    let user_id = match current_user(&headers) {
        Ok(id) => id,
        Err(e) => return error_reply(&e),
    };

    match state.orchestrator.list_favorites(user_id).await {
        Ok(favorites) => {
            let message = if favorites.is_empty() {
                "No favorite locations found for user."
            } else {
                "Favorite locations retrieved."
            };
            (StatusCode::OK, Json(ApiResponse::ok(favorites, message)))
        }
        Err(e) => error_reply(&e),
    }
}

/// GET /api/favorites/:id
pub async fn get_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> (StatusCode, Json<ApiResponse<FavoriteWithForecast>>) {
    let user_id = match current_user(&headers) {
        Ok(id) => id,
        Err(e) => return error_reply(&e),
    };

    match state.orchestrator.get_favorite(user_id, &id).await {
        Ok(favorite) => (
            StatusCode::OK,
            Json(ApiResponse::ok(favorite, "Favorite location retrieved.")),
        ),
        Err(e) => error_reply(&e),
    }
}

/// DELETE /api/favorites/:id
pub async fn remove_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> (StatusCode, Json<ApiResponse<String>>) {
    let user_id = match current_user(&headers) {
        Ok(id) => id,
        Err(e) => return error_reply(&e),
    };

    match state.orchestrator.remove_favorite(user_id, &id).await {
        Ok(removed) => {
            let message = format!(
                "Favorite location '{}' (ID: {}) deleted successfully.",
                removed.name, removed.id
            );
            (StatusCode::OK, Json(ApiResponse::ok(removed.id, message)))
        }
        Err(e) => error_reply(&e),
    }
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
