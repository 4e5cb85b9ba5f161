//! Route definitions for the PulseHub HTTP API.
//!
//! Routes are grouped by resource. The router receives `AppState` and
//! passes it to all handlers via Axum's `State` extractor.

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::handlers;
use crate::state::AppState;

/// Build the route table with state attached. Middleware is added by
/// [`build_app`](crate::app::build_app).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(presence_routes())
        .merge(session_routes())
        .merge(activity_routes())
        .merge(health_routes())
        .with_state(state)
}

/// Presence status, listings, history and eviction
fn presence_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/presence",
            get(handlers::presence::list_presence).post(handlers::presence::update_presence),
        )
        .route("/presence/online", get(handlers::presence::online_users))
        .route("/presence/evict-stale", post(handlers::presence::evict_stale))
        .route(
            "/presence/{user_id}",
            get(handlers::presence::get_presence).delete(handlers::presence::set_offline),
        )
        .route(
            "/presence/{user_id}/history",
            get(handlers::presence::presence_history),
        )
}

/// Session lifecycle, trails and aggregate views
fn session_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sessions",
            get(handlers::session::list_sessions).post(handlers::session::create_session),
        )
        .route("/sessions/active", get(handlers::session::list_active_sessions))
        .route("/sessions/risky", get(handlers::session::risky_sessions))
        .route(
            "/sessions/suspicious-activity",
            get(handlers::session::suspicious_activity),
        )
        .route("/sessions/online-users", get(handlers::session::online_users))
        .route("/sessions/geography", get(handlers::session::geography))
        .route("/sessions/device-stats", get(handlers::session::device_stats))
        .route(
            "/sessions/concurrent-users",
            get(handlers::session::concurrent_users),
        )
        .route("/sessions/stats", get(handlers::session::session_stats))
        .route(
            "/sessions/user/{user_id}",
            get(handlers::session::user_sessions),
        )
        .route(
            "/sessions/user/{user_id}/kick",
            post(handlers::session::kick_user),
        )
        .route(
            "/sessions/user/{user_id}/all",
            delete(handlers::session::destroy_user_sessions),
        )
        .route(
            "/sessions/current/{user_id}",
            get(handlers::session::current_session),
        )
        .route(
            "/sessions/user/{user_id}/online",
            get(handlers::session::user_online_status),
        )
        .route(
            "/sessions/{id}",
            get(handlers::session::get_session).delete(handlers::session::destroy_session),
        )
        .route("/sessions/{id}/extend", post(handlers::session::extend_session))
        .route("/sessions/{id}/lock", post(handlers::session::lock_session))
        .route("/sessions/{id}/unlock", post(handlers::session::unlock_session))
        .route("/sessions/{id}/kick", post(handlers::session::kick_session))
        .route(
            "/sessions/{id}/validate",
            get(handlers::session::validate_session),
        )
        .route(
            "/sessions/{id}/activity",
            get(handlers::session::session_activity_history)
                .post(handlers::session::log_session_activity),
        )
}

/// Activity log and feeds
fn activity_routes() -> Router<AppState> {
    Router::new()
        .route("/activity", post(handlers::activity::log_activity))
        .route("/activity/recent", get(handlers::activity::recent_activity))
        .route(
            "/activity/user/{user_id}",
            get(handlers::activity::user_activity),
        )
        .route(
            "/activity/resource/{resource_type}/{resource_id}",
            get(handlers::activity::resource_activity),
        )
        .route(
            "/activity/stats/{user_id}",
            get(handlers::activity::activity_stats),
        )
        .route("/activity/{id}", delete(handlers::activity::delete_activity))
}

/// Liveness and detailed health
fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
}
