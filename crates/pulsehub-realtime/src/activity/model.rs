//! Activity records and aggregates.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use pulsehub_core::types::ActivityId;

/// One logged user activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Activity ID
    pub id: ActivityId,
    /// Acting user
    pub user_id: String,
    /// Action name, e.g. `task_completed`
    pub action: String,
    /// Resource type the action touched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Resource the action touched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Free-form details
    pub metadata: Map<String, Value>,
    /// When it was logged
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    /// The `(type, id)` pair when both are present.
    pub fn resource(&self) -> Option<(&str, &str)> {
        match (self.resource_type.as_deref(), self.resource_id.as_deref()) {
            (Some(t), Some(id)) => Some((t, id)),
            _ => None,
        }
    }
}

/// Input to [`ActivityBroadcaster::log_activity`](super::broadcaster::ActivityBroadcaster::log_activity).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewActivity {
    /// Acting user
    #[serde(default)]
    pub user_id: String,
    /// Action name
    #[serde(default)]
    pub action: String,
    /// Resource type
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Resource identifier
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Free-form details
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Per-user activity aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityStats {
    /// User ID
    pub user_id: String,
    /// Number of logged activities
    pub total: usize,
    /// Count per action
    pub by_action: BTreeMap<String, usize>,
    /// Count per resource type
    pub by_resource_type: BTreeMap<String, usize>,
    /// Oldest activity
    pub first_activity_at: Option<DateTime<Utc>>,
    /// Newest activity
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl ActivityStats {
    /// Aggregate a user's activities.
    pub fn from_records(user_id: &str, records: &[ActivityRecord]) -> Self {
        let mut by_action = BTreeMap::new();
        let mut by_resource_type = BTreeMap::new();
        for record in records {
            *by_action.entry(record.action.clone()).or_insert(0) += 1;
            if let Some(resource_type) = &record.resource_type {
                *by_resource_type.entry(resource_type.clone()).or_insert(0) += 1;
            }
        }
        Self {
            user_id: user_id.to_string(),
            total: records.len(),
            by_action,
            by_resource_type,
            first_activity_at: records.iter().map(|r| r.created_at).min(),
            last_activity_at: records.iter().map(|r| r.created_at).max(),
        }
    }
}
