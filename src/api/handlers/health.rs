//! Health and status endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::server::AppState;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "tradegate"
        })),
    )
}

/// Runtime status
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
        "backend": state.forwarder.backend().base_url,
        "rate_limit": {
            "max_requests": state.rate_limiter.max_requests(),
            "window_ms": state.rate_limiter.window_ms(),
            "tracked_webhooks": state.rate_limiter.tracked_count(),
        },
    }))
}
