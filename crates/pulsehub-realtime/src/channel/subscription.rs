//! Subscription tracking: which handle is registered under which key.

use dashmap::DashMap;

use pulsehub_core::types::SubscriptionId;

/// Where a subscription lives in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelKey {
    /// Exact channel name (the empty string is a valid channel).
    Exact(String),
    /// Prefix pattern: the subscribed name minus its trailing `*`.
    Prefix(String),
}

impl ChannelKey {
    /// Classifies a subscribed name. A trailing `*` makes it a prefix
    /// pattern; a lone `*` therefore matches every channel.
    pub fn from_subscription(name: &str) -> Self {
        match name.strip_suffix('*') {
            Some(prefix) => ChannelKey::Prefix(prefix.to_string()),
            None => ChannelKey::Exact(name.to_string()),
        }
    }
}

/// Reverse index from subscription handle to registry key.
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    handles: DashMap<SubscriptionId, ChannelKey>,
}

impl SubscriptionTracker {
    /// Creates a new subscription tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a subscription.
    pub fn add(&self, id: SubscriptionId, key: ChannelKey) {
        self.handles.insert(id, key);
    }

    /// Removes a subscription, returning where it was registered.
    pub fn remove(&self, id: SubscriptionId) -> Option<ChannelKey> {
        self.handles.remove(&id).map(|(_, key)| key)
    }

    /// Number of live subscriptions.
    pub fn count(&self) -> usize {
        self.handles.len()
    }
}
