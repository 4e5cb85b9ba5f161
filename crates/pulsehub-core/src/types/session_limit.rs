//! Session limit resolution types.

use serde::{Deserialize, Serialize};

/// Resolved concurrent-session limit for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionLimit {
    /// A fixed maximum number of concurrent sessions.
    Fixed(u32),
    /// No per-user limit.
    Unlimited,
}

impl SessionLimit {
    /// Check whether a given valid session count already fills this limit.
    pub fn is_exceeded_by(&self, active_count: usize) -> bool {
        match self {
            Self::Fixed(max) => active_count >= *max as usize,
            Self::Unlimited => false,
        }
    }

    /// Return the numeric limit, or `None` for unlimited.
    pub fn as_max(&self) -> Option<u32> {
        match self {
            Self::Fixed(max) => Some(*max),
            Self::Unlimited => None,
        }
    }
}

impl From<u32> for SessionLimit {
    /// Convert a `u32` to a `SessionLimit`. `0` means unlimited.
    fn from(value: u32) -> Self {
        if value == 0 {
            Self::Unlimited
        } else {
            Self::Fixed(value)
        }
    }
}
