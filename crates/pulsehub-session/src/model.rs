//! Session records and the read models derived from them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use pulsehub_core::types::{ActivityId, SessionId};

use crate::device::DeviceClass;

/// Lifecycle state of a session, derived from its fields and the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Usable.
    Active,
    /// Temporarily unusable until unlocked.
    Locked,
    /// Past `expires_at`. Terminal.
    Expired,
    /// Kicked or destroyed. Terminal.
    Destroyed,
}

impl SessionState {
    /// Expired and destroyed sessions never come back.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Destroyed)
    }
}

/// One device or browser's access grant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    /// Session ID
    pub id: SessionId,
    /// Owning user
    pub user_id: String,
    /// Opaque bearer token, only returned at creation
    #[serde(skip_serializing)]
    pub token: String,
    /// Client IP at creation
    pub ip_address: String,
    /// Client user agent at creation
    pub user_agent: String,
    /// Last reported location
    pub location: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry; only ever moves forward
    pub expires_at: DateTime<Utc>,
    /// Last logged activity
    pub last_activity: DateTime<Utc>,
    /// Whether validation is currently refused
    pub locked: bool,
    /// Last computed risk score in `[0, 1]`
    pub risk_score: f64,
    /// Whether the last risk scan flagged this session
    pub flagged: bool,
    /// When the session was kicked or destroyed
    pub destroyed_at: Option<DateTime<Utc>>,
    /// Why the session was kicked or destroyed
    pub destroyed_reason: Option<String>,
}

impl Session {
    /// State at `now`.
    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if self.destroyed_at.is_some() {
            SessionState::Destroyed
        } else if now > self.expires_at {
            SessionState::Expired
        } else if self.locked {
            SessionState::Locked
        } else {
            SessionState::Active
        }
    }

    /// Whether the session can be used at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == SessionState::Active
    }

    /// When the session became terminal, if it has.
    pub fn ended_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.state_at(now) {
            SessionState::Destroyed => self.destroyed_at,
            SessionState::Expired => Some(self.expires_at),
            _ => None,
        }
    }
}

/// Session plus its derived state, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    /// The session
    #[serde(flatten)]
    pub session: Session,
    /// Derived state
    pub state: SessionState,
}

impl SessionView {
    /// Snapshot a session's state at `now`.
    pub fn at(session: Session, now: DateTime<Utc>) -> Self {
        let state = session.state_at(now);
        Self { session, state }
    }
}

/// Input to session creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSession {
    /// Owning user
    #[serde(default)]
    pub user_id: String,
    /// Client IP address
    #[serde(default)]
    pub ip_address: String,
    /// Client user agent
    #[serde(default)]
    pub user_agent: String,
    /// Optional location label (city, region or country)
    #[serde(default)]
    pub location: Option<String>,
}

/// Input to per-session activity logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionActivityRequest {
    /// Action name
    #[serde(default)]
    pub action: String,
    /// What the action touched
    #[serde(default)]
    pub resource: Option<String>,
    /// Client IP for this request, if different from the session's
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Client user agent for this request
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Location for this request
    #[serde(default)]
    pub location: Option<String>,
    /// Free-form details
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// One entry in a session's activity trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionActivity {
    /// Entry ID
    pub id: ActivityId,
    /// Session the entry belongs to
    pub session_id: SessionId,
    /// Owning user
    pub user_id: String,
    /// Action name
    pub action: String,
    /// What the action touched
    pub resource: Option<String>,
    /// Client IP
    pub ip_address: String,
    /// Client user agent
    pub user_agent: String,
    /// Location, if reported
    pub location: Option<String>,
    /// Free-form details
    pub metadata: Map<String, Value>,
    /// When it was logged
    pub created_at: DateTime<Utc>,
}

/// Valid sessions per location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoBucket {
    /// Location label, `unknown` when none was reported
    pub location: String,
    /// Valid sessions there
    pub sessions: usize,
    /// Distinct users there
    pub users: usize,
}

/// Valid sessions per device class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    /// Valid sessions counted
    pub total: usize,
    /// Count per device class
    pub by_device: BTreeMap<DeviceClass, usize>,
}

/// Concurrency snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrentUsers {
    /// Users with at least one valid session
    pub concurrent_users: usize,
    /// Valid sessions
    pub active_sessions: usize,
    /// Highest `concurrent_users` observed since start
    pub peak_concurrent_users: usize,
}

/// Counts per state across every tracked session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Sessions tracked (not yet purged)
    pub total: usize,
    /// Active sessions
    pub active: usize,
    /// Locked sessions
    pub locked: usize,
    /// Expired sessions
    pub expired: usize,
    /// Destroyed sessions
    pub destroyed: usize,
    /// Mean lifetime of ended sessions in seconds
    pub average_duration_seconds: f64,
}
