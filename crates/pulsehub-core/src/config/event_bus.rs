//! Event bus configuration.

use serde::{Deserialize, Serialize};

/// In-process event bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Capacity of the bounded dispatch queue. Events dispatched while the
    /// queue is full are dropped and counted.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1024
}
