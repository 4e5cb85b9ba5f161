//! Presence tracking configuration.

use serde::{Deserialize, Serialize};

/// Presence tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Maximum number of transitions kept per user.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// A presence not updated for this many minutes is forced offline.
    #[serde(default = "default_stale_after")]
    pub stale_after_minutes: u64,
    /// How often the eviction sweep runs.
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_seconds: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            stale_after_minutes: default_stale_after(),
            eviction_interval_seconds: default_eviction_interval(),
        }
    }
}

fn default_history_limit() -> usize {
    100
}

fn default_stale_after() -> u64 {
    30
}

fn default_eviction_interval() -> u64 {
    60
}
