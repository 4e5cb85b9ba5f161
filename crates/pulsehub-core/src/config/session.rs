//! Session tracking configuration.

use serde::{Deserialize, Serialize};

/// Session tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a newly created session in minutes.
    #[serde(default = "default_ttl")]
    pub default_ttl_minutes: u64,
    /// Extension applied when an extend request names no duration.
    #[serde(default = "default_extension")]
    pub default_extension_seconds: i64,
    /// Upper bound on a single extension.
    #[serde(default = "default_max_extension")]
    pub max_extension_seconds: i64,
    /// Minutes a terminal session is kept before the sweep purges it.
    #[serde(default = "default_retention")]
    pub retention_minutes: u64,
    /// Interval for the expired-session sweep in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
    /// Interval for the suspicious-activity scan in seconds.
    #[serde(default = "default_risk_scan_interval")]
    pub risk_scan_interval_seconds: u64,
    /// Maximum activity entries kept per session.
    #[serde(default = "default_activity_history_limit")]
    pub activity_history_limit: usize,
    /// Concurrent session limits.
    #[serde(default)]
    pub limits: SessionLimitsConfig,
    /// Risk heuristic thresholds.
    #[serde(default)]
    pub risk: RiskConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: default_ttl(),
            default_extension_seconds: default_extension(),
            max_extension_seconds: default_max_extension(),
            retention_minutes: default_retention(),
            cleanup_interval_seconds: default_cleanup_interval(),
            risk_scan_interval_seconds: default_risk_scan_interval(),
            activity_history_limit: default_activity_history_limit(),
            limits: SessionLimitsConfig::default(),
            risk: RiskConfig::default(),
        }
    }
}

/// Concurrent session limits configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionLimitsConfig {
    /// Maximum valid sessions per user. `0` means unlimited.
    #[serde(default)]
    pub max_per_user: u32,
    /// Overflow strategy when a user exceeds their session limit.
    #[serde(default)]
    pub overflow_strategy: OverflowStrategy,
}

/// Strategy applied when a user tries to exceed their session limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowStrategy {
    /// Deny the new session.
    #[default]
    Deny,
    /// Kick the oldest existing session to make room.
    KickOldest,
}

impl std::fmt::Display for OverflowStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverflowStrategy::Deny => write!(f, "deny"),
            OverflowStrategy::KickOldest => write!(f, "kick_oldest"),
        }
    }
}

/// Thresholds for the heuristic risk policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Look-back window over a session's activity trail.
    #[serde(default = "default_window")]
    pub window_minutes: i64,
    /// Distinct IP addresses tolerated inside the window.
    #[serde(default = "default_max_ips")]
    pub max_distinct_ips: usize,
    /// Distinct user agents tolerated inside the window.
    #[serde(default = "default_max_agents")]
    pub max_distinct_user_agents: usize,
    /// Activity entries per minute tolerated inside the window.
    #[serde(default = "default_max_rpm")]
    pub max_requests_per_minute: f64,
    /// Score at or above which a session is flagged.
    #[serde(default = "default_flag_threshold")]
    pub flag_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            window_minutes: default_window(),
            max_distinct_ips: default_max_ips(),
            max_distinct_user_agents: default_max_agents(),
            max_requests_per_minute: default_max_rpm(),
            flag_threshold: default_flag_threshold(),
        }
    }
}

fn default_ttl() -> u64 {
    24 * 60
}

fn default_extension() -> i64 {
    3600
}

fn default_max_extension() -> i64 {
    24 * 3600
}

fn default_retention() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    300
}

fn default_risk_scan_interval() -> u64 {
    300
}

fn default_activity_history_limit() -> usize {
    500
}

fn default_window() -> i64 {
    60
}

fn default_max_ips() -> usize {
    1
}

fn default_max_agents() -> usize {
    1
}

fn default_max_rpm() -> f64 {
    60.0
}

fn default_flag_threshold() -> f64 {
    0.7
}
