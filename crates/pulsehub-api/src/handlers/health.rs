//! Health check handlers.

use axum::Json;
use axum::extract::State;

use pulsehub_core::types::response::ApiResponse;

use crate::dto::response::{DetailedHealthResponse, HealthResponse};
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    }))
}

/// GET /health/detailed
pub async fn health_detailed(
    State(state): State<AppState>,
) -> Json<ApiResponse<DetailedHealthResponse>> {
    Json(ApiResponse::ok(DetailedHealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        event_bus: state.event_bus.metrics(),
        channels: state.event_bus.channel_count(),
        presence: state.presence.presence_counts(),
        sessions: state.sessions.get_session_stats(),
        concurrency: state.sessions.get_concurrent_user_count(),
    }))
}
