//! Stale presence eviction: forces users offline once they stop reporting.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::Value;
use tracing;

use pulsehub_realtime::PresenceTracker;

use crate::executor::{JobExecutionError, JobHandler};

/// Handles the `presence_eviction` job
#[derive(Debug)]
pub struct PresenceEvictionHandler {
    /// Presence tracker to sweep
    presence: Arc<PresenceTracker>,
    /// Users not updated within this window are set offline
    stale_after: Duration,
}

impl PresenceEvictionHandler {
    /// Create a new presence eviction handler
    pub fn new(presence: Arc<PresenceTracker>, stale_after: Duration) -> Self {
        Self {
            presence,
            stale_after,
        }
    }
}

#[async_trait]
impl JobHandler for PresenceEvictionHandler {
    fn job_type(&self) -> &str {
        "presence_eviction"
    }

    async fn execute(&self) -> Result<Option<Value>, JobExecutionError> {
        tracing::trace!("Running presence eviction");
        let evicted = self.presence.evict_stale(self.stale_after);

        Ok(Some(serde_json::json!({
            "task": "presence_eviction",
            "evicted": evicted,
            "stale_after_minutes": self.stale_after.num_minutes(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsehub_core::config::presence::PresenceConfig;
    use pulsehub_realtime::PresenceStatus;

    #[tokio::test]
    async fn test_evicts_users_past_the_window() {
        let presence = Arc::new(PresenceTracker::new(&PresenceConfig::default(), None));
        presence.update_presence("u1", "online", serde_json::Map::new()).unwrap();
        presence.update_presence("u2", "offline", serde_json::Map::new()).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let handler = PresenceEvictionHandler::new(presence.clone(), Duration::zero());
        let summary = handler.execute().await.unwrap().unwrap();

        assert_eq!(summary["evicted"], 1);
        assert_eq!(
            presence.get_presence("u1").unwrap().status,
            PresenceStatus::Offline
        );
    }

    #[tokio::test]
    async fn test_recent_users_are_kept() {
        let presence = Arc::new(PresenceTracker::new(&PresenceConfig::default(), None));
        presence.update_presence("u1", "away", serde_json::Map::new()).unwrap();

        let handler = PresenceEvictionHandler::new(presence.clone(), Duration::minutes(30));
        let summary = handler.execute().await.unwrap().unwrap();

        assert_eq!(summary["evicted"], 0);
        assert_eq!(presence.get_presence("u1").unwrap().status, PresenceStatus::Away);
    }
}
