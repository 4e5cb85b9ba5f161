//! Activity handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use validator::Validate;

use pulsehub_core::types::Page;
use pulsehub_core::types::response::ApiResponse;
use pulsehub_realtime::activity::model::{ActivityRecord, ActivityStats};

use crate::dto::request::LogActivityRequest;
use crate::error::ApiResult;
use crate::extractors::PaginationParams;
use crate::extractors::pagination::limits;
use crate::extractors::path::parse_activity_id;
use crate::state::AppState;

/// POST /activity
pub async fn log_activity(
    State(state): State<AppState>,
    Json(req): Json<LogActivityRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ActivityRecord>>)> {
    req.validate()?;
    let record = state.activity.log_activity(req.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(record))))
}

/// GET /activity/user/{user_id}
pub async fn user_activity(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<Page<ActivityRecord>>> {
    let (default, max) = limits::ACTIVITY;
    let page = params.into_page_request(default, max);
    Ok(Json(state.activity.get_user_activity(&user_id, page).await?))
}

/// GET /activity/resource/{resource_type}/{resource_id}
pub async fn resource_activity(
    State(state): State<AppState>,
    Path((resource_type, resource_id)): Path<(String, String)>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<Page<ActivityRecord>>> {
    let (default, max) = limits::ACTIVITY;
    let page = params.into_page_request(default, max);
    let records = state
        .activity
        .get_resource_activity(&resource_type, &resource_id, page)
        .await?;
    Ok(Json(records))
}

/// GET /activity/recent
pub async fn recent_activity(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<Page<ActivityRecord>>> {
    let (default, max) = limits::ACTIVITY_RECENT;
    let page = params.into_page_request(default, max);
    Ok(Json(state.activity.get_recent(page).await?))
}

/// GET /activity/stats/{user_id}
pub async fn activity_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<ActivityStats>>> {
    let stats = state.activity.get_stats(&user_id).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// DELETE /activity/{id}
pub async fn delete_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.activity.delete_activity(parse_activity_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
