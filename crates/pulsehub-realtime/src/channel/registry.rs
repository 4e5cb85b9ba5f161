//! Channel registry: exact channels, wildcard patterns, and the handle
//! index used to unsubscribe.

use std::sync::Arc;

use dashmap::DashMap;

use pulsehub_core::types::SubscriptionId;

use super::channel::Channel;
use super::listener::EventListener;
use super::subscription::{ChannelKey, SubscriptionTracker};

/// Registry of all channels with at least one listener.
///
/// Locking: each operation touches at most one shard entry at a time and
/// never holds a registry guard while a listener runs.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    /// Exact channel name → Channel.
    channels: DashMap<String, Channel>,
    /// Prefix (subscribed name minus `*`) → Channel.
    patterns: DashMap<String, Channel>,
    /// Subscription handle → key (reverse index).
    subscriptions: SubscriptionTracker,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` under `name` and returns its handle.
    pub fn subscribe(&self, name: &str, listener: Arc<dyn EventListener>) -> SubscriptionId {
        let id = SubscriptionId::new();
        let key = ChannelKey::from_subscription(name);
        let (map, key_name) = self.map_for(&key);
        map.entry(key_name.clone())
            .or_insert_with(|| Channel::new(name.to_string()))
            .subscribe(id, listener);
        self.subscriptions.add(id, key);
        id
    }

    /// Removes a subscription. Returns `false` for unknown handles.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Some(key) = self.subscriptions.remove(id) else {
            return false;
        };
        let (map, key_name) = self.map_for(&key);
        let mut removed = false;
        if let Some(mut channel) = map.get_mut(key_name) {
            removed = channel.unsubscribe(id);
            if channel.is_empty() {
                drop(channel);
                map.remove_if(key_name, |_, ch| ch.is_empty());
            }
        }
        removed
    }

    /// Every listener that should receive an event published on `channel`:
    /// the exact match plus every matching prefix pattern.
    pub fn listeners_for(&self, channel: &str) -> Vec<(SubscriptionId, Arc<dyn EventListener>)> {
        let mut listeners = self
            .channels
            .get(channel)
            .map(|ch| ch.listeners())
            .unwrap_or_default();
        for pattern in self.patterns.iter() {
            if channel.starts_with(pattern.key().as_str()) {
                listeners.extend(pattern.value().listeners());
            }
        }
        listeners
    }

    /// Returns subscriber count for an exact channel name or pattern.
    pub fn channel_subscriber_count(&self, name: &str) -> usize {
        let key = ChannelKey::from_subscription(name);
        let (map, key_name) = self.map_for(&key);
        map.get(key_name).map(|ch| ch.subscriber_count()).unwrap_or(0)
    }

    /// Returns total number of channels and patterns with listeners.
    pub fn channel_count(&self) -> usize {
        self.channels.len() + self.patterns.len()
    }

    /// Returns the number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.count()
    }

    fn map_for<'a>(&'a self, key: &'a ChannelKey) -> (&'a DashMap<String, Channel>, &'a String) {
        match key {
            ChannelKey::Exact(name) => (&self.channels, name),
            ChannelKey::Prefix(prefix) => (&self.patterns, prefix),
        }
    }
}
