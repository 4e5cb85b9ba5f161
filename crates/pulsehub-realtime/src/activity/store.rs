//! Activity persistence seam and its in-memory implementation.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::RwLock;

use pulsehub_core::result::AppResult;
use pulsehub_core::types::ActivityId;

use super::model::ActivityRecord;

/// Persists activity facts. Every lookup returns newest first.
#[async_trait]
pub trait ActivityLogStore: Send + Sync + 'static {
    /// Persist one activity.
    async fn record(&self, activity: ActivityRecord) -> AppResult<()>;

    /// Activities by one user.
    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<ActivityRecord>>;

    /// Activities touching one resource.
    async fn find_by_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<Vec<ActivityRecord>>;

    /// Every stored activity.
    async fn recent(&self) -> AppResult<Vec<ActivityRecord>>;

    /// Delete one activity. Returns whether it existed.
    async fn delete(&self, id: ActivityId) -> AppResult<bool>;
}

/// Bounded in-process activity log.
#[derive(Debug)]
pub struct MemoryActivityLog {
    /// Newest first
    entries: RwLock<VecDeque<ActivityRecord>>,
    capacity: usize,
}

impl MemoryActivityLog {
    /// Create a log keeping at most `capacity` activities.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    async fn filtered(&self, keep: impl Fn(&ActivityRecord) -> bool) -> Vec<ActivityRecord> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|a| keep(a))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ActivityLogStore for MemoryActivityLog {
    async fn record(&self, activity: ActivityRecord) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        entries.push_front(activity);
        entries.truncate(self.capacity);
        Ok(())
    }

    async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<ActivityRecord>> {
        Ok(self.filtered(|a| a.user_id == user_id).await)
    }

    async fn find_by_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<Vec<ActivityRecord>> {
        Ok(self
            .filtered(|a| a.resource() == Some((resource_type, resource_id)))
            .await)
    }

    async fn recent(&self) -> AppResult<Vec<ActivityRecord>> {
        Ok(self.filtered(|_| true).await)
    }

    async fn delete(&self, id: ActivityId) -> AppResult<bool> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|a| a.id != id);
        Ok(entries.len() != before)
    }
}
