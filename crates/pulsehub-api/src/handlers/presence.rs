//! Presence handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::Duration;
use validator::Validate;

use pulsehub_core::error::{AppError, codes};
use pulsehub_core::types::Page;
use pulsehub_core::types::response::ApiResponse;
use pulsehub_realtime::PresenceStatus;
use pulsehub_realtime::presence::tracker::{Presence, PresenceTransition, PresenceUpdate};

use crate::dto::request::{EvictStaleRequest, PresenceFilter, UpdatePresenceRequest};
use crate::dto::response::EvictStaleResponse;
use crate::error::ApiResult;
use crate::extractors::PaginationParams;
use crate::extractors::pagination::limits;
use crate::state::AppState;

/// One year.
const MAX_EVICTION_MINUTES: i64 = 366 * 24 * 60;

/// POST /presence
pub async fn update_presence(
    State(state): State<AppState>,
    Json(req): Json<UpdatePresenceRequest>,
) -> ApiResult<Json<ApiResponse<PresenceUpdate>>> {
    req.validate()?;
    let update = state
        .presence
        .update_presence(&req.user_id, &req.status, req.metadata)?;
    Ok(Json(ApiResponse::ok(update)))
}

/// GET /presence?status=
pub async fn list_presence(
    State(state): State<AppState>,
    Query(filter): Query<PresenceFilter>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<Page<Presence>>> {
    let status = match filter.status.as_deref() {
        Some(raw) if !raw.trim().is_empty() => Some(PresenceStatus::parse(raw)?),
        _ => None,
    };
    let (default, max) = limits::PRESENCE;
    let page = params.into_page_request(default, max);
    Ok(Json(page.paginate(state.presence.list_presences(status))))
}

/// GET /presence/online
pub async fn online_users(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Json<Page<String>> {
    let (default, max) = limits::PRESENCE;
    let page = params.into_page_request(default, max);
    Json(page.paginate(state.presence.get_online_users()))
}

/// GET /presence/{user_id}
pub async fn get_presence(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Presence>>> {
    let presence = state.presence.get_presence(&user_id)?;
    Ok(Json(ApiResponse::ok(presence)))
}

/// DELETE /presence/{user_id}
pub async fn set_offline(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<PresenceUpdate>>> {
    let update = state.presence.set_offline(&user_id)?;
    Ok(Json(ApiResponse::ok(update)))
}

/// GET /presence/{user_id}/history
pub async fn presence_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Json<Page<PresenceTransition>> {
    let (default, max) = limits::PRESENCE_HISTORY;
    let page = params.into_page_request(default, max);
    Json(state.presence.get_presence_history(&user_id, page))
}

/// POST /presence/evict-stale
pub async fn evict_stale(
    State(state): State<AppState>,
    Json(req): Json<EvictStaleRequest>,
) -> ApiResult<Json<ApiResponse<EvictStaleResponse>>> {
    if !(1..=MAX_EVICTION_MINUTES).contains(&req.duration_minutes) {
        return Err(AppError::validation_code(
            codes::INVALID_DURATION,
            format!("duration_minutes must be between 1 and {MAX_EVICTION_MINUTES}"),
        )
        .into());
    }
    let evicted = state
        .presence
        .evict_stale(Duration::minutes(req.duration_minutes));
    Ok(Json(ApiResponse::ok(EvictStaleResponse {
        evicted,
        duration_minutes: req.duration_minutes,
    })))
}
