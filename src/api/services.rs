use axum::{Json, extract::State, http::Uri, response::IntoResponse};
use std::collections::BTreeMap;

use super::{
    error::ApiError,
    models::{HealthResponse, IndexResponse},
    state::AppState,
};

/// Cached data endpoint (GET /data)
///
/// Never waits on an in-flight fetch: the view is a lock-free read of the
/// latest cache snapshot.
pub async fn get_data(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.cache.read())
}

/// Health check endpoint (GET /health)
///
/// Always 200 while the process serves requests. A missing zstd codec shows
/// up under `codecs` but does not make the service unhealthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        codecs: state.codecs.status(),
        fetches: state.metrics.snapshot(),
        last_failure: state
            .cache
            .latest_outcome()
            .and_then(|outcome| outcome.failure_kind()),
    })
}

/// Discovery document (GET /)
pub async fn index() -> impl IntoResponse {
    let endpoints = BTreeMap::from([
        ("/data", "Get the latest fetched data"),
        ("/health", "Health check"),
    ]);

    Json(IndexResponse {
        message: "pollproxy: cached upstream JSON",
        endpoints,
    })
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
