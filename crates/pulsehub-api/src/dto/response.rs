//! Response DTOs.

use std::collections::BTreeMap;

use serde::Serialize;

use pulsehub_core::types::SessionId;
use pulsehub_realtime::PresenceStatus;
use pulsehub_realtime::metrics::BusMetricsSnapshot;
use pulsehub_session::model::{ConcurrentUsers, SessionStats, SessionView};

/// Returned once, on creation: the only response that carries the token.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedSessionResponse {
    /// The new session
    #[serde(flatten)]
    pub session: SessionView,
    /// Opaque session token
    pub token: String,
}

/// `GET /sessions/{id}/validate`
#[derive(Debug, Clone, Serialize)]
pub struct ValidateSessionResponse {
    /// Session checked
    pub session_id: SessionId,
    /// Whether it is usable right now
    pub valid: bool,
}

/// `POST /sessions/user/{userID}/kick`
#[derive(Debug, Clone, Serialize)]
pub struct KickUserResponse {
    /// User whose sessions were kicked
    pub user_id: String,
    /// Sessions newly destroyed
    pub kicked: usize,
}

/// `GET /sessions/user/{userID}/online`
#[derive(Debug, Clone, Serialize)]
pub struct OnlineStatusResponse {
    /// User checked
    pub user_id: String,
    /// Has at least one valid session
    pub online: bool,
}

/// `GET /sessions/online-users`
#[derive(Debug, Clone, Serialize)]
pub struct OnlineUsersResponse {
    /// Users with a valid session, sorted
    pub users: Vec<String>,
    /// Number of users
    pub count: usize,
}

/// `POST /presence/evict-stale`
#[derive(Debug, Clone, Serialize)]
pub struct EvictStaleResponse {
    /// Users forced offline
    pub evicted: usize,
    /// Threshold applied
    pub duration_minutes: i64,
}

/// `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `ok` when the server answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Seconds since startup
    pub uptime_seconds: i64,
}

/// `GET /health/detailed`
#[derive(Debug, Clone, Serialize)]
pub struct DetailedHealthResponse {
    /// Always `ok` when the server answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Seconds since startup
    pub uptime_seconds: i64,
    /// Event bus counters
    pub event_bus: BusMetricsSnapshot,
    /// Channels with at least one subscriber
    pub channels: usize,
    /// Users per presence status
    pub presence: BTreeMap<PresenceStatus, usize>,
    /// Session totals per state
    pub sessions: SessionStats,
    /// Current and peak concurrency
    pub concurrency: ConcurrentUsers,
}
