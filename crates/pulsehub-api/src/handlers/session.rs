//! Session handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use validator::Validate;

use pulsehub_core::error::{AppError, codes};
use pulsehub_core::types::Page;
use pulsehub_core::types::response::ApiResponse;
use pulsehub_session::model::{
    ConcurrentUsers, DeviceStats, GeoBucket, Session, SessionActivity, SessionStats, SessionView,
};
use pulsehub_session::RiskAssessment;

use crate::dto::request::{CreateSessionRequest, ExtendSessionRequest, LogSessionActivityRequest};
use crate::dto::response::{
    CreatedSessionResponse, KickUserResponse, OnlineStatusResponse, OnlineUsersResponse,
    ValidateSessionResponse,
};
use crate::error::ApiResult;
use crate::extractors::PaginationParams;
use crate::extractors::pagination::limits;
use crate::extractors::path::parse_session_id;
use crate::state::AppState;

fn view(session: Session) -> SessionView {
    SessionView::at(session, Utc::now())
}

fn view_page(page: Page<Session>) -> Page<SessionView> {
    let now = Utc::now();
    page.map(|session| SessionView::at(session, now))
}

/// POST /sessions
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<CreatedSessionResponse>>)> {
    req.validate()?;
    let session = state
        .session_limiter
        .create_session(&state.sessions, req.into())?;
    let token = session.token.clone();
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(CreatedSessionResponse {
            session: view(session),
            token,
        })),
    ))
}

/// GET /sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Json<Page<SessionView>> {
    let (default, max) = limits::SESSIONS;
    let page = params.into_page_request(default, max);
    Json(view_page(state.sessions.list_sessions(page)))
}

/// GET /sessions/active
pub async fn list_active_sessions(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Json<Page<SessionView>> {
    let (default, max) = limits::SESSIONS;
    let page = params.into_page_request(default, max);
    Json(view_page(state.sessions.list_active_sessions(page)))
}

/// GET /sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<SessionView>>> {
    let session = state.sessions.get_session(parse_session_id(&id)?)?;
    Ok(Json(ApiResponse::ok(view(session))))
}

/// DELETE /sessions/{id}
pub async fn destroy_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<SessionView>>> {
    let session = state.sessions.destroy_session(parse_session_id(&id)?)?;
    Ok(Json(ApiResponse::ok(view(session))))
}

/// POST /sessions/{id}/extend
///
/// The body is optional; without one the configured default applies.
pub async fn extend_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<SessionView>>> {
    let id = parse_session_id(&id)?;
    let req: ExtendSessionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ExtendSessionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            AppError::validation_code(codes::VALIDATION_FAILED, format!("Invalid body: {e}"))
        })?
    };
    let session = state.sessions.extend_session(id, req.duration_seconds)?;
    Ok(Json(ApiResponse::ok(view(session))))
}

/// POST /sessions/{id}/lock
pub async fn lock_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<SessionView>>> {
    let session = state.sessions.lock_session(parse_session_id(&id)?)?;
    Ok(Json(ApiResponse::ok(view(session))))
}

/// POST /sessions/{id}/unlock
pub async fn unlock_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<SessionView>>> {
    let session = state.sessions.unlock_session(parse_session_id(&id)?)?;
    Ok(Json(ApiResponse::ok(view(session))))
}

/// POST /sessions/{id}/kick
pub async fn kick_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<SessionView>>> {
    let session = state.sessions.kick_session(parse_session_id(&id)?)?;
    Ok(Json(ApiResponse::ok(view(session))))
}

/// GET /sessions/{id}/validate
pub async fn validate_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<ValidateSessionResponse>>> {
    let session_id = parse_session_id(&id)?;
    Ok(Json(ApiResponse::ok(ValidateSessionResponse {
        session_id,
        valid: state.sessions.validate_session(session_id),
    })))
}

/// POST /sessions/{id}/activity
pub async fn log_session_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<LogSessionActivityRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<SessionActivity>>)> {
    req.validate()?;
    let activity = state
        .sessions
        .log_activity(parse_session_id(&id)?, req.into())?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(activity))))
}

/// GET /sessions/{id}/activity
pub async fn session_activity_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<Page<SessionActivity>>> {
    let (default, max) = limits::SESSION_ACTIVITY;
    let page = params.into_page_request(default, max);
    let history = state
        .sessions
        .get_activity_history(parse_session_id(&id)?, page)?;
    Ok(Json(history))
}

/// GET /sessions/user/{user_id}
pub async fn user_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<PaginationParams>,
) -> Json<Page<SessionView>> {
    let (default, max) = limits::SESSIONS;
    let page = params.into_page_request(default, max);
    Json(view_page(state.sessions.get_user_sessions(&user_id, page)))
}

/// POST /sessions/user/{user_id}/kick
pub async fn kick_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<KickUserResponse>>> {
    let kicked = state.sessions.kick_user(&user_id)?;
    Ok(Json(ApiResponse::ok(KickUserResponse { user_id, kicked })))
}

/// DELETE /sessions/user/{user_id}/all
pub async fn destroy_user_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<KickUserResponse>>> {
    let kicked = state.sessions.destroy_user_sessions(&user_id)?;
    Ok(Json(ApiResponse::ok(KickUserResponse { user_id, kicked })))
}

/// GET /sessions/current/{user_id}
pub async fn current_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ApiResponse<SessionView>>> {
    let session = state.sessions.current_session(&user_id)?;
    Ok(Json(ApiResponse::ok(view(session))))
}

/// GET /sessions/user/{user_id}/online
pub async fn user_online_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Json<ApiResponse<OnlineStatusResponse>> {
    let online = state.sessions.check_user_online_status(&user_id);
    Json(ApiResponse::ok(OnlineStatusResponse { user_id, online }))
}

/// GET /sessions/risky
pub async fn risky_sessions(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Json<Page<SessionView>> {
    let (default, max) = limits::SESSIONS;
    let page = params.into_page_request(default, max);
    Json(view_page(state.sessions.get_risky_sessions(page)))
}

/// GET /sessions/suspicious-activity
///
/// Runs a scan now and returns the flagged assessments.
pub async fn suspicious_activity(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<RiskAssessment>>> {
    Json(ApiResponse::ok(state.sessions.detect_suspicious_activity()))
}

/// GET /sessions/online-users
pub async fn online_users(State(state): State<AppState>) -> Json<ApiResponse<OnlineUsersResponse>> {
    let users = state.sessions.get_online_users();
    let count = users.len();
    Json(ApiResponse::ok(OnlineUsersResponse { users, count }))
}

/// GET /sessions/geography
pub async fn geography(State(state): State<AppState>) -> Json<ApiResponse<Vec<GeoBucket>>> {
    Json(ApiResponse::ok(state.sessions.get_geographic_distribution()))
}

/// GET /sessions/device-stats
pub async fn device_stats(State(state): State<AppState>) -> Json<ApiResponse<DeviceStats>> {
    Json(ApiResponse::ok(state.sessions.get_device_stats()))
}

/// GET /sessions/concurrent-users
pub async fn concurrent_users(State(state): State<AppState>) -> Json<ApiResponse<ConcurrentUsers>> {
    Json(ApiResponse::ok(state.sessions.get_concurrent_user_count()))
}

/// GET /sessions/stats
pub async fn session_stats(State(state): State<AppState>) -> Json<ApiResponse<SessionStats>> {
    Json(ApiResponse::ok(state.sessions.get_session_stats()))
}
