//! Transient events distributed through the event bus.
//!
//! Events describe a change that has already been committed by a tracker.
//! They are produced and consumed in-process and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of change an [`Event`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A user's presence status changed.
    PresenceChanged,
    /// A user-level activity was logged.
    ActivityLogged,
    /// A session was created.
    SessionCreated,
    /// A session's expiry was pushed forward.
    SessionExtended,
    /// A session was locked.
    SessionLocked,
    /// A session was unlocked.
    SessionUnlocked,
    /// A session was kicked or destroyed.
    SessionDestroyed,
}

impl EventKind {
    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PresenceChanged => "presence_changed",
            Self::ActivityLogged => "activity_logged",
            Self::SessionCreated => "session_created",
            Self::SessionExtended => "session_extended",
            Self::SessionLocked => "session_locked",
            Self::SessionUnlocked => "session_unlocked",
            Self::SessionDestroyed => "session_destroyed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A description of one committed change, addressed to one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID.
    pub id: Uuid,
    /// What happened.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Bus channel this event is addressed to.
    pub channel: String,
    /// The user the change concerns, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Event payload.
    pub data: serde_json::Value,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create a new event for `channel`.
    pub fn new(kind: EventKind, channel: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            channel: channel.into(),
            user_id: None,
            data,
            timestamp: Utc::now(),
        }
    }

    /// Attach the user the change concerns.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// The same event re-addressed to another channel.
    ///
    /// Used when a single change fans out to several channels: the copies
    /// share the payload and timestamp but get their own ID.
    pub fn readdressed(&self, channel: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            ..self.clone()
        }
    }
}
