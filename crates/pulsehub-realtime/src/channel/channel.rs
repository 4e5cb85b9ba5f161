//! A single channel and its listeners.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use pulsehub_core::types::SubscriptionId;

use super::listener::EventListener;

/// Listeners registered under one channel name or wildcard pattern.
pub struct Channel {
    /// Channel name or pattern as subscribed.
    pub name: String,
    listeners: HashMap<SubscriptionId, Arc<dyn EventListener>>,
}

impl Channel {
    /// Creates an empty channel.
    pub fn new(name: String) -> Self {
        Self {
            name,
            listeners: HashMap::new(),
        }
    }

    /// Adds a listener.
    pub fn subscribe(&mut self, id: SubscriptionId, listener: Arc<dyn EventListener>) {
        self.listeners.insert(id, listener);
    }

    /// Removes a listener. Returns whether it was present.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Clones out the current listeners so they can be invoked without
    /// holding the registry lock.
    pub fn listeners(&self) -> Vec<(SubscriptionId, Arc<dyn EventListener>)> {
        self.listeners
            .iter()
            .map(|(id, l)| (*id, Arc::clone(l)))
            .collect()
    }

    /// Number of listeners.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether the channel has no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("subscribers", &self.listeners.len())
            .finish()
    }
}
