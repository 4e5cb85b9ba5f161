//! Activity broadcast policy configuration.

use serde::{Deserialize, Serialize};

/// Action-name sets consulted for every logged activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Read-only actions that are never broadcast.
    #[serde(default = "default_suppressed")]
    pub suppressed_actions: Vec<String>,
    /// Actions that are additionally broadcast on the global channel.
    #[serde(default = "default_significant")]
    pub significant_actions: Vec<String>,
    /// Activities kept by the in-memory log before the oldest are dropped.
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            suppressed_actions: default_suppressed(),
            significant_actions: default_significant(),
            log_capacity: default_log_capacity(),
        }
    }
}

fn default_suppressed() -> Vec<String> {
    ["view_activity", "list_activities", "view_stats", "export_activities"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_significant() -> Vec<String> {
    [
        "project_created",
        "project_deleted",
        "bug_resolved",
        "deployment_complete",
        "feature_released",
        "milestone_achieved",
        "task_completed",
        "merge_completed",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_log_capacity() -> usize {
    10_000
}
