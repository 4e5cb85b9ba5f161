//! Activity broadcaster: persist first, then publish per policy.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use pulsehub_core::error::{AppError, codes};
use pulsehub_core::events::{Event, EventKind};
use pulsehub_core::result::AppResult;
use pulsehub_core::traits::EventDispatcher;
use pulsehub_core::types::{ActivityId, Page, PageRequest};

use super::model::{ActivityRecord, ActivityStats, NewActivity};
use super::policy::ActivityPolicy;
use super::store::ActivityLogStore;

/// Logs user activities and publishes them according to an
/// [`ActivityPolicy`].
pub struct ActivityBroadcaster {
    store: Arc<dyn ActivityLogStore>,
    policy: ActivityPolicy,
    dispatcher: Option<Arc<dyn EventDispatcher>>,
}

impl std::fmt::Debug for ActivityBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityBroadcaster")
            .field("policy", &self.policy)
            .field("dispatcher", &self.dispatcher.is_some())
            .finish()
    }
}

impl ActivityBroadcaster {
    /// Create a broadcaster. With no dispatcher, activities are only
    /// persisted.
    pub fn new(
        store: Arc<dyn ActivityLogStore>,
        policy: ActivityPolicy,
        dispatcher: Option<Arc<dyn EventDispatcher>>,
    ) -> Self {
        Self {
            store,
            policy,
            dispatcher,
        }
    }

    /// The policy in force.
    pub fn policy(&self) -> &ActivityPolicy {
        &self.policy
    }

    /// Persist an activity, then publish it on the channels the policy
    /// selects. A persistence failure fails the call; publishing never does.
    pub async fn log_activity(&self, request: NewActivity) -> AppResult<ActivityRecord> {
        let user_id = request.user_id.trim();
        if user_id.is_empty() {
            return Err(AppError::validation_code(
                codes::MISSING_USER_ID,
                "user_id is required",
            ));
        }
        let action = request.action.trim();
        if action.is_empty() {
            return Err(AppError::validation_code(
                codes::MISSING_ACTION,
                "action is required",
            ));
        }

        let record = ActivityRecord {
            id: ActivityId::new(),
            user_id: user_id.to_string(),
            action: action.to_string(),
            resource_type: non_empty(request.resource_type),
            resource_id: non_empty(request.resource_id),
            metadata: request.metadata,
            created_at: Utc::now(),
        };

        self.store.record(record.clone()).await.map_err(|e| {
            AppError::internal(format!("Failed to persist activity: {}", e.message))
        })?;

        self.publish(&record);
        Ok(record)
    }

    /// Activities by one user, newest first.
    pub async fn get_user_activity(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> AppResult<Page<ActivityRecord>> {
        Ok(page.paginate(self.store.find_by_user(user_id).await?))
    }

    /// Activities touching one resource, newest first.
    pub async fn get_resource_activity(
        &self,
        resource_type: &str,
        resource_id: &str,
        page: PageRequest,
    ) -> AppResult<Page<ActivityRecord>> {
        Ok(page.paginate(
            self.store
                .find_by_resource(resource_type, resource_id)
                .await?,
        ))
    }

    /// All activities, newest first.
    pub async fn get_recent(&self, page: PageRequest) -> AppResult<Page<ActivityRecord>> {
        Ok(page.paginate(self.store.recent().await?))
    }

    /// Aggregate counts for one user.
    pub async fn get_stats(&self, user_id: &str) -> AppResult<ActivityStats> {
        let records = self.store.find_by_user(user_id).await?;
        Ok(ActivityStats::from_records(user_id, &records))
    }

    /// Delete an activity.
    pub async fn delete_activity(&self, id: ActivityId) -> AppResult<()> {
        if self.store.delete(id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(format!("Activity {id} not found")))
        }
    }

    fn publish(&self, record: &ActivityRecord) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };
        let channels = self.policy.channels_for(record);
        if channels.is_empty() {
            debug!(action = %record.action, "Activity suppressed from broadcast");
            return;
        }
        let payload = match serde_json::to_value(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(activity_id = %record.id, error = %e, "Failed to encode activity event");
                return;
            }
        };
        for channel in channels {
            dispatcher.dispatch(
                Event::new(
                    EventKind::ActivityLogged,
                    channel.to_channel_string(),
                    payload.clone(),
                )
                .with_user(record.user_id.clone()),
            );
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::store::MemoryActivityLog;
    use crate::testing::RecordingDispatcher;
    use async_trait::async_trait;
    use pulsehub_core::error::ErrorKind;

    fn broadcaster() -> (ActivityBroadcaster, Arc<RecordingDispatcher>) {
        let recorder = Arc::new(RecordingDispatcher::default());
        let broadcaster = ActivityBroadcaster::new(
            Arc::new(MemoryActivityLog::new(100)),
            ActivityPolicy::default(),
            Some(recorder.clone() as Arc<dyn EventDispatcher>),
        );
        (broadcaster, recorder)
    }

    fn new_activity(action: &str, resource: Option<(&str, &str)>) -> NewActivity {
        NewActivity {
            user_id: "u1".into(),
            action: action.into(),
            resource_type: resource.map(|(t, _)| t.to_string()),
            resource_id: resource.map(|(_, id)| id.to_string()),
            ..NewActivity::default()
        }
    }

    #[tokio::test]
    async fn test_view_stats_is_persisted_but_never_broadcast() {
        let (broadcaster, recorder) = broadcaster();
        broadcaster
            .log_activity(new_activity("view_stats", Some(("project", "p1"))))
            .await
            .unwrap();

        assert!(recorder.events().is_empty());
        let page = broadcaster
            .get_user_activity("u1", PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_project_created_dispatches_exactly_three() {
        let (broadcaster, recorder) = broadcaster();
        broadcaster
            .log_activity(new_activity("project_created", Some(("project", "p1"))))
            .await
            .unwrap();

        assert_eq!(
            recorder.channels(),
            vec!["activity:u1", "activity:resource:project:p1", ""]
        );
        assert!(recorder
            .events()
            .iter()
            .all(|e| e.kind == EventKind::ActivityLogged && e.data["action"] == "project_created"));
    }

    #[tokio::test]
    async fn test_blank_resource_fields_skip_resource_channel() {
        let (broadcaster, recorder) = broadcaster();
        let record = broadcaster
            .log_activity(new_activity("comment_added", Some(("task", "  "))))
            .await
            .unwrap();
        assert_eq!(record.resource_id, None);
        assert_eq!(recorder.channels(), vec!["activity:u1"]);
    }

    #[tokio::test]
    async fn test_validation_and_not_found() {
        let (broadcaster, _) = broadcaster();
        let mut missing_user = new_activity("x", None);
        missing_user.user_id = " ".into();
        let err = broadcaster.log_activity(missing_user).await.unwrap_err();
        assert!(err.has_code(codes::MISSING_USER_ID));

        let err = broadcaster
            .log_activity(new_activity("", None))
            .await
            .unwrap_err();
        assert!(err.has_code(codes::MISSING_ACTION));

        let err = broadcaster
            .delete_activity(ActivityId::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_stats_aggregate_by_action_and_resource() {
        let (broadcaster, _) = broadcaster();
        for (action, resource) in [
            ("task_completed", Some(("task", "t1"))),
            ("task_completed", Some(("task", "t2"))),
            ("comment_added", Some(("project", "p1"))),
            ("login", None),
        ] {
            broadcaster
                .log_activity(new_activity(action, resource))
                .await
                .unwrap();
        }
        let stats = broadcaster.get_stats("u1").await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_action["task_completed"], 2);
        assert_eq!(stats.by_resource_type["task"], 2);
        assert!(stats.first_activity_at <= stats.last_activity_at);
    }

    struct FailingStore;

    #[async_trait]
    impl ActivityLogStore for FailingStore {
        async fn record(&self, _activity: ActivityRecord) -> AppResult<()> {
            Err(AppError::internal("disk full"))
        }
        async fn find_by_user(&self, _user_id: &str) -> AppResult<Vec<ActivityRecord>> {
            Ok(Vec::new())
        }
        async fn find_by_resource(&self, _t: &str, _id: &str) -> AppResult<Vec<ActivityRecord>> {
            Ok(Vec::new())
        }
        async fn recent(&self) -> AppResult<Vec<ActivityRecord>> {
            Ok(Vec::new())
        }
        async fn delete(&self, _id: ActivityId) -> AppResult<bool> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_skips_dispatch() {
        let recorder = Arc::new(RecordingDispatcher::default());
        let broadcaster = ActivityBroadcaster::new(
            Arc::new(FailingStore),
            ActivityPolicy::default(),
            Some(recorder.clone() as Arc<dyn EventDispatcher>),
        );
        let err = broadcaster
            .log_activity(new_activity("project_created", None))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert!(recorder.events().is_empty());
    }
}
