//! Suppression and significance policy for activity broadcast.

use std::collections::BTreeSet;

use pulsehub_core::config::activity::ActivityConfig;
use pulsehub_core::error::AppError;
use pulsehub_core::result::AppResult;

use super::model::ActivityRecord;
use crate::channel::types::ChannelType;

/// Immutable action-name sets deciding where an activity is broadcast.
///
/// An action is never both suppressed and significant; construction fails
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityPolicy {
    suppressed: BTreeSet<String>,
    significant: BTreeSet<String>,
}

impl ActivityPolicy {
    /// Build a policy from explicit sets.
    pub fn new<S, G>(suppressed: S, significant: G) -> AppResult<Self>
    where
        S: IntoIterator,
        S::Item: Into<String>,
        G: IntoIterator,
        G::Item: Into<String>,
    {
        let suppressed: BTreeSet<String> = suppressed.into_iter().map(Into::into).collect();
        let significant: BTreeSet<String> = significant.into_iter().map(Into::into).collect();

        let overlap: Vec<&String> = suppressed.intersection(&significant).collect();
        if !overlap.is_empty() {
            return Err(AppError::configuration(format!(
                "Actions cannot be both suppressed and significant: {overlap:?}"
            )));
        }
        Ok(Self {
            suppressed,
            significant,
        })
    }

    /// Build the policy from the `activity` config section.
    pub fn from_config(config: &ActivityConfig) -> AppResult<Self> {
        Self::new(
            config.suppressed_actions.iter().cloned(),
            config.significant_actions.iter().cloned(),
        )
    }

    /// Read-only actions that are never broadcast.
    pub fn is_suppressed(&self, action: &str) -> bool {
        self.suppressed.contains(action)
    }

    /// Actions also broadcast on the global channel.
    pub fn is_significant(&self, action: &str) -> bool {
        self.significant.contains(action)
    }

    /// Channels an activity is published on, in dispatch order.
    pub fn channels_for(&self, activity: &ActivityRecord) -> Vec<ChannelType> {
        if self.is_suppressed(&activity.action) {
            return Vec::new();
        }
        let mut channels = vec![ChannelType::ActivityUser(activity.user_id.clone())];
        if let Some((resource_type, resource_id)) = activity.resource() {
            channels.push(ChannelType::ActivityResource {
                resource_type: resource_type.to_string(),
                resource_id: resource_id.to_string(),
            });
        }
        if self.is_significant(&activity.action) {
            channels.push(ChannelType::ActivityGlobal);
        }
        channels
    }
}

impl Default for ActivityPolicy {
    fn default() -> Self {
        let config = ActivityConfig::default();
        Self {
            suppressed: config.suppressed_actions.into_iter().collect(),
            significant: config.significant_actions.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pulsehub_core::error::ErrorKind;
    use pulsehub_core::types::ActivityId;
    use serde_json::Map;

    fn activity(action: &str, resource: Option<(&str, &str)>) -> ActivityRecord {
        ActivityRecord {
            id: ActivityId::new(),
            user_id: "u1".into(),
            action: action.into(),
            resource_type: resource.map(|(t, _)| t.to_string()),
            resource_id: resource.map(|(_, id)| id.to_string()),
            metadata: Map::new(),
            created_at: Utc::now(),
        }
    }

    fn names(channels: Vec<ChannelType>) -> Vec<String> {
        channels.iter().map(ChannelType::to_channel_string).collect()
    }

    #[test]
    fn test_suppressed_action_goes_nowhere() {
        let policy = ActivityPolicy::default();
        for action in ["view_activity", "list_activities", "view_stats", "export_activities"] {
            assert!(policy
                .channels_for(&activity(action, Some(("project", "p1"))))
                .is_empty());
        }
    }

    #[test]
    fn test_significant_action_reaches_three_channels() {
        let policy = ActivityPolicy::default();
        assert_eq!(
            names(policy.channels_for(&activity("project_created", Some(("project", "p1"))))),
            vec!["activity:u1", "activity:resource:project:p1", ""]
        );
    }

    #[test]
    fn test_ordinary_action_stays_scoped() {
        let policy = ActivityPolicy::default();
        assert_eq!(
            names(policy.channels_for(&activity("comment_added", Some(("task", "t1"))))),
            vec!["activity:u1", "activity:resource:task:t1"]
        );
        assert_eq!(
            names(policy.channels_for(&activity("comment_added", None))),
            vec!["activity:u1"]
        );
    }

    #[test]
    fn test_overlapping_sets_are_rejected() {
        let err = ActivityPolicy::new(["view_stats"], ["view_stats", "task_completed"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_from_config_matches_default() {
        let policy = ActivityPolicy::from_config(&ActivityConfig::default()).unwrap();
        assert_eq!(policy, ActivityPolicy::default());
    }
}
