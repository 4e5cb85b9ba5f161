//! Presence status definitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use pulsehub_core::error::{AppError, codes};

/// User presence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// User is active.
    Online,
    /// User has marked themselves as away.
    Away,
    /// User is connected but idle.
    Idle,
    /// User is not connected.
    Offline,
    /// Do not disturb.
    DoNotDisturb,
}

impl PresenceStatus {
    /// All statuses, in display order.
    pub const ALL: [PresenceStatus; 5] = [
        Self::Online,
        Self::Away,
        Self::Idle,
        Self::Offline,
        Self::DoNotDisturb,
    ];

    /// Parses a client-supplied status, rejecting empty and unknown values.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation_code(
                codes::MISSING_STATUS,
                "status is required",
            ));
        }
        trimmed.parse()
    }

    /// Converts to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Idle => "idle",
            Self::Offline => "offline",
            Self::DoNotDisturb => "do_not_disturb",
        }
    }

    /// Only `online` counts as online for the `presence:online_users` feed.
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl FromStr for PresenceStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "idle" => Ok(Self::Idle),
            "offline" => Ok(Self::Offline),
            "dnd" | "do_not_disturb" => Ok(Self::DoNotDisturb),
            other => Err(AppError::validation_code(
                codes::INVALID_STATUS,
                format!("unknown presence status '{other}'"),
            )),
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
