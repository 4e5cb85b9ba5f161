//! Channel type definitions and parsing.

use serde::{Deserialize, Serialize};

/// Typed channel identifiers.
///
/// Channel names on the bus are plain strings; this enum is the single
/// place that knows how they are spelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum ChannelType {
    /// Per-user presence changes.
    PresenceUser(String),
    /// Transitions into or out of `online`.
    PresenceOnlineUsers,
    /// Every presence change.
    PresenceGlobal,
    /// Per-user activity feed.
    ActivityUser(String),
    /// Activity on one resource.
    ActivityResource {
        /// Resource type, e.g. `project`.
        resource_type: String,
        /// Resource identifier.
        resource_id: String,
    },
    /// Unscoped channel carrying significant activity only.
    ActivityGlobal,
    /// Per-user session lifecycle events.
    SessionUser(String),
}

impl ChannelType {
    /// Parses a channel string into a typed channel.
    pub fn parse(channel: &str) -> Option<Self> {
        if channel.is_empty() {
            return Some(ChannelType::ActivityGlobal);
        }
        let parts: Vec<&str> = channel.splitn(2, ':').collect();
        match parts.as_slice() {
            ["presence"] => Some(ChannelType::PresenceGlobal),
            ["presence", "online_users"] => Some(ChannelType::PresenceOnlineUsers),
            ["presence", id] if !id.is_empty() => Some(ChannelType::PresenceUser(id.to_string())),
            ["activity", rest] => match rest.strip_prefix("resource:") {
                Some(resource) => {
                    let (resource_type, resource_id) = resource.split_once(':')?;
                    if resource_type.is_empty() || resource_id.is_empty() {
                        return None;
                    }
                    Some(ChannelType::ActivityResource {
                        resource_type: resource_type.to_string(),
                        resource_id: resource_id.to_string(),
                    })
                }
                None if !rest.is_empty() => Some(ChannelType::ActivityUser(rest.to_string())),
                None => None,
            },
            ["session", id] if !id.is_empty() => Some(ChannelType::SessionUser(id.to_string())),
            _ => None,
        }
    }

    /// Converts back to a channel string.
    pub fn to_channel_string(&self) -> String {
        match self {
            ChannelType::PresenceUser(id) => format!("presence:{id}"),
            ChannelType::PresenceOnlineUsers => "presence:online_users".to_string(),
            ChannelType::PresenceGlobal => "presence".to_string(),
            ChannelType::ActivityUser(id) => format!("activity:{id}"),
            ChannelType::ActivityResource {
                resource_type,
                resource_id,
            } => format!("activity:resource:{resource_type}:{resource_id}"),
            ChannelType::ActivityGlobal => String::new(),
            ChannelType::SessionUser(id) => format!("session:{id}"),
        }
    }
}
