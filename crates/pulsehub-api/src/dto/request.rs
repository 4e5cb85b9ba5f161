//! Request DTOs.
//!
//! Required fields default to empty so the trackers can reject them with
//! their specific error codes; declarative rules only bound sizes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use pulsehub_realtime::activity::model::NewActivity;
use pulsehub_session::{NewSession, SessionActivityRequest};

/// Body of `POST /presence`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdatePresenceRequest {
    /// User whose presence changes
    #[serde(default)]
    #[validate(length(max = 255))]
    pub user_id: String,
    /// New status
    #[serde(default)]
    #[validate(length(max = 32))]
    pub status: String,
    /// Replaces the stored metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Query of `GET /presence`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresenceFilter {
    /// Only users in this status
    pub status: Option<String>,
}

/// Body of `POST /presence/evict-stale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictStaleRequest {
    /// Users idle for longer than this are set offline
    #[serde(default)]
    pub duration_minutes: i64,
}

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateSessionRequest {
    /// Owning user
    #[serde(default)]
    #[validate(length(max = 255))]
    pub user_id: String,
    /// Client IP address
    #[serde(default)]
    pub ip_address: String,
    /// Client user agent
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub user_agent: String,
    /// Optional location label
    #[serde(default)]
    #[validate(length(max = 255))]
    pub location: Option<String>,
}

impl From<CreateSessionRequest> for NewSession {
    fn from(req: CreateSessionRequest) -> Self {
        Self {
            user_id: req.user_id,
            ip_address: req.ip_address,
            user_agent: req.user_agent,
            location: req.location,
        }
    }
}

/// Body of `POST /sessions/{id}/extend`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendSessionRequest {
    /// Extension length; the configured default when absent
    pub duration_seconds: Option<i64>,
}

/// Body of `POST /sessions/{id}/activity`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LogSessionActivityRequest {
    /// Action name
    #[serde(default)]
    #[validate(length(max = 128))]
    pub action: String,
    /// Resource touched
    #[serde(default)]
    #[validate(length(max = 512))]
    pub resource: Option<String>,
    /// Client IP for this request
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Client user agent for this request
    #[serde(default)]
    #[validate(length(max = 1024))]
    pub user_agent: Option<String>,
    /// Client location for this request
    #[serde(default)]
    #[validate(length(max = 255))]
    pub location: Option<String>,
    /// Free-form details
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl From<LogSessionActivityRequest> for SessionActivityRequest {
    fn from(req: LogSessionActivityRequest) -> Self {
        Self {
            action: req.action,
            resource: req.resource,
            ip_address: req.ip_address,
            user_agent: req.user_agent,
            location: req.location,
            metadata: req.metadata,
        }
    }
}

/// Body of `POST /activity`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LogActivityRequest {
    /// Acting user
    #[serde(default)]
    #[validate(length(max = 255))]
    pub user_id: String,
    /// Action name
    #[serde(default)]
    #[validate(length(max = 128))]
    pub action: String,
    /// Resource type
    #[serde(default)]
    #[validate(length(max = 128))]
    pub resource_type: Option<String>,
    /// Resource identifier
    #[serde(default)]
    #[validate(length(max = 255))]
    pub resource_id: Option<String>,
    /// Free-form details
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl From<LogActivityRequest> for NewActivity {
    fn from(req: LogActivityRequest) -> Self {
        Self {
            user_id: req.user_id,
            action: req.action,
            resource_type: req.resource_type,
            resource_id: req.resource_id,
            metadata: req.metadata,
        }
    }
}
