//! Presence tracker: per-user status state machine with broadcast policy.
//!
//! Locking discipline: every read-modify-write for a user happens while
//! holding that user's map entry, and no operation ever touches two users
//! at once. Events are dispatched while the entry guard is still held, so
//! the per-user event order always matches the write order. Dispatchers
//! must therefore never call back into the tracker.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use pulsehub_core::config::presence::PresenceConfig;
use pulsehub_core::error::{AppError, codes};
use pulsehub_core::events::{Event, EventKind};
use pulsehub_core::result::AppResult;
use pulsehub_core::traits::EventDispatcher;
use pulsehub_core::types::{Page, PageRequest};

use super::status::PresenceStatus;
use crate::channel::types::ChannelType;

/// Current presence of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    /// User ID
    pub user_id: String,
    /// Current status
    pub status: PresenceStatus,
    /// Client-supplied metadata from the last update
    pub metadata: Map<String, Value>,
    /// When the record was last written
    pub updated_at: DateTime<Utc>,
    /// Tracker-wide logical timestamp of the last write
    pub version: u64,
}

/// One recorded status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceTransition {
    /// User ID
    pub user_id: String,
    /// Status before the transition
    pub from_status: PresenceStatus,
    /// Status after the transition
    pub to_status: PresenceStatus,
    /// Metadata written with the transition
    pub metadata: Map<String, Value>,
    /// When the transition was applied
    pub changed_at: DateTime<Utc>,
    /// Logical timestamp of the transition
    pub version: u64,
}

/// Outcome of a presence write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    /// The record after the write
    pub presence: Presence,
    /// Status before the write (`offline` for a first update)
    pub previous_status: PresenceStatus,
    /// Whether the status changed and was broadcast
    pub changed: bool,
}

#[derive(Debug)]
struct PresenceEntry {
    presence: Presence,
    history: VecDeque<PresenceTransition>,
}

impl PresenceEntry {
    fn absent(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            presence: Presence {
                user_id: user_id.to_string(),
                status: PresenceStatus::Offline,
                metadata: Map::new(),
                updated_at: now,
                version: 0,
            },
            history: VecDeque::new(),
        }
    }
}

/// Tracks presence state for all users.
pub struct PresenceTracker {
    /// User ID → presence and its history
    entries: DashMap<String, PresenceEntry>,
    /// Logical clock handing out write versions
    clock: AtomicU64,
    /// Transitions kept per user
    history_limit: usize,
    /// Where changes are published, if anywhere
    dispatcher: Option<Arc<dyn EventDispatcher>>,
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("users", &self.entries.len())
            .field("history_limit", &self.history_limit)
            .field("dispatcher", &self.dispatcher.is_some())
            .finish()
    }
}

impl PresenceTracker {
    /// Create a tracker. With no dispatcher, changes are recorded but never
    /// broadcast.
    pub fn new(config: &PresenceConfig, dispatcher: Option<Arc<dyn EventDispatcher>>) -> Self {
        Self {
            entries: DashMap::new(),
            clock: AtomicU64::new(0),
            history_limit: config.history_limit.max(1),
            dispatcher,
        }
    }

    /// Record a status update for a user, creating the record on first use.
    ///
    /// Broadcasts only when the status actually changes.
    pub fn update_presence(
        &self,
        user_id: &str,
        status: &str,
        metadata: Map<String, Value>,
    ) -> AppResult<PresenceUpdate> {
        let user_id = require_user_id(user_id)?;
        let status = PresenceStatus::parse(status)?;
        let now = Utc::now();

        let update = match self.entries.entry(user_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                let update = self.apply(occupied.get_mut(), status, Some(metadata), now);
                self.broadcast(&update);
                update
            }
            Entry::Vacant(vacant) => {
                let mut entry = PresenceEntry::absent(user_id, now);
                let update = self.apply(&mut entry, status, Some(metadata), now);
                let _guard = vacant.insert(entry);
                self.broadcast(&update);
                update
            }
        };

        debug!(
            user_id = %user_id,
            from = %update.previous_status,
            to = %status,
            changed = update.changed,
            "Presence updated"
        );
        Ok(update)
    }

    /// Get a user's current presence
    pub fn get_presence(&self, user_id: &str) -> AppResult<Presence> {
        self.entries
            .get(user_id)
            .map(|entry| entry.presence.clone())
            .ok_or_else(|| AppError::not_found(format!("No presence recorded for user '{user_id}'")))
    }

    /// Force a user offline.
    ///
    /// Already-offline users succeed without broadcasting; users that were
    /// never seen are `NotFound`.
    pub fn set_offline(&self, user_id: &str) -> AppResult<PresenceUpdate> {
        let user_id = require_user_id(user_id)?;
        let mut entry = self.entries.get_mut(user_id).ok_or_else(|| {
            AppError::not_found(format!("No presence recorded for user '{user_id}'"))
        })?;
        let update = self.apply(&mut entry, PresenceStatus::Offline, None, Utc::now());
        self.broadcast(&update);
        Ok(update)
    }

    /// Users whose status is `online`, sorted.
    pub fn get_online_users(&self) -> Vec<String> {
        self.get_presence_by_status(PresenceStatus::Online)
    }

    /// Users currently in `status`, sorted.
    pub fn get_presence_by_status(&self, status: PresenceStatus) -> Vec<String> {
        let mut users: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.presence.status == status)
            .map(|entry| entry.key().clone())
            .collect();
        users.sort();
        users
    }

    /// Every presence record, optionally filtered by status, sorted by user.
    pub fn list_presences(&self, status: Option<PresenceStatus>) -> Vec<Presence> {
        let mut presences: Vec<Presence> = self
            .entries
            .iter()
            .filter(|entry| status.is_none_or(|s| entry.presence.status == s))
            .map(|entry| entry.presence.clone())
            .collect();
        presences.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        presences
    }

    /// Transition history for a user, newest first. Unknown users have an
    /// empty history.
    pub fn get_presence_history(&self, user_id: &str, page: PageRequest) -> Page<PresenceTransition> {
        let history: Vec<PresenceTransition> = self
            .entries
            .get(user_id)
            .map(|entry| entry.history.iter().cloned().collect())
            .unwrap_or_default();
        page.paginate(history)
    }

    /// Number of users per status.
    pub fn presence_counts(&self) -> BTreeMap<PresenceStatus, usize> {
        let mut counts: BTreeMap<PresenceStatus, usize> =
            PresenceStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for entry in self.entries.iter() {
            *counts.entry(entry.presence.status).or_default() += 1;
        }
        counts
    }

    /// Force offline every non-offline user not updated within `threshold`.
    /// Returns the number evicted.
    pub fn evict_stale(&self, threshold: Duration) -> usize {
        self.evict_stale_at(threshold, Utc::now())
    }

    /// [`evict_stale`](Self::evict_stale) measured from `now`.
    ///
    /// Candidates are snapshotted with their version; each is re-checked
    /// under its entry lock and skipped if any write landed since the
    /// snapshot, so a fresh update is never clobbered by the sweep.
    pub fn evict_stale_at(&self, threshold: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - threshold;
        let evicted = self
            .stale_candidates(cutoff)
            .into_iter()
            .filter(|(user_id, version)| self.evict_candidate(user_id, *version))
            .count();
        if evicted > 0 {
            info!(
                evicted = evicted,
                threshold_minutes = threshold.num_minutes(),
                "Evicted stale presences"
            );
        }
        evicted
    }

    fn stale_candidates(&self, cutoff: DateTime<Utc>) -> Vec<(String, u64)> {
        self.entries
            .iter()
            .filter(|entry| {
                entry.presence.status != PresenceStatus::Offline
                    && entry.presence.updated_at < cutoff
            })
            .map(|entry| (entry.key().clone(), entry.presence.version))
            .collect()
    }

    fn evict_candidate(&self, user_id: &str, seen_version: u64) -> bool {
        let Some(mut entry) = self.entries.get_mut(user_id) else {
            return false;
        };
        if entry.presence.version != seen_version
            || entry.presence.status == PresenceStatus::Offline
        {
            return false;
        }
        let update = self.apply(&mut entry, PresenceStatus::Offline, None, Utc::now());
        self.broadcast(&update);
        true
    }

    /// Writes a new status into a locked entry. Must be called with the
    /// entry guard held.
    fn apply(
        &self,
        entry: &mut PresenceEntry,
        status: PresenceStatus,
        metadata: Option<Map<String, Value>>,
        now: DateTime<Utc>,
    ) -> PresenceUpdate {
        let previous_status = entry.presence.status;
        let version = self.clock.fetch_add(1, Ordering::SeqCst) + 1;

        entry.presence.status = status;
        if let Some(metadata) = metadata {
            entry.presence.metadata = metadata;
        }
        entry.presence.updated_at = now;
        entry.presence.version = version;

        let changed = previous_status != status;
        if changed {
            entry.history.push_front(PresenceTransition {
                user_id: entry.presence.user_id.clone(),
                from_status: previous_status,
                to_status: status,
                metadata: entry.presence.metadata.clone(),
                changed_at: now,
                version,
            });
            entry.history.truncate(self.history_limit);
        }

        PresenceUpdate {
            presence: entry.presence.clone(),
            previous_status,
            changed,
        }
    }

    /// Publishes a change. Must be called with the entry guard held.
    fn broadcast(&self, update: &PresenceUpdate) {
        if !update.changed {
            return;
        }
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };

        let user_id = &update.presence.user_id;
        let old_status = update.previous_status;
        let new_status = update.presence.status;
        let event = Event::new(
            EventKind::PresenceChanged,
            ChannelType::PresenceUser(user_id.clone()).to_channel_string(),
            json!({
                "user_id": user_id,
                "old_status": old_status,
                "new_status": new_status,
                "presence": update.presence,
            }),
        )
        .with_user(user_id.clone());

        let online_users = (old_status.is_online() != new_status.is_online())
            .then(|| event.readdressed(ChannelType::PresenceOnlineUsers.to_channel_string()));
        let global = event.readdressed(ChannelType::PresenceGlobal.to_channel_string());

        dispatcher.dispatch(event);
        if let Some(online_users) = online_users {
            dispatcher.dispatch(online_users);
        }
        dispatcher.dispatch(global);
    }

    #[cfg(test)]
    fn backdate(&self, user_id: &str, by: Duration) {
        if let Some(mut entry) = self.entries.get_mut(user_id) {
            entry.presence.updated_at -= by;
        }
    }
}

fn require_user_id(user_id: &str) -> AppResult<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation_code(
            codes::MISSING_USER_ID,
            "user_id is required",
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDispatcher;

    fn tracker() -> (PresenceTracker, Arc<RecordingDispatcher>) {
        let recorder = Arc::new(RecordingDispatcher::default());
        let tracker = PresenceTracker::new(
            &PresenceConfig::default(),
            Some(recorder.clone() as Arc<dyn EventDispatcher>),
        );
        (tracker, recorder)
    }

    #[test]
    fn test_repeated_identical_update_broadcasts_once() {
        let (tracker, recorder) = tracker();
        tracker.update_presence("u1", "online", Map::new()).unwrap();
        tracker.update_presence("u1", "online", Map::new()).unwrap();

        assert_eq!(
            recorder.channels(),
            vec!["presence:u1", "presence:online_users", "presence"]
        );
    }

    #[test]
    fn test_online_users_channel_only_on_online_boundary() {
        let (tracker, recorder) = tracker();
        let steps = [
            ("away", false),
            ("online", true),
            ("idle", true),
            ("do_not_disturb", false),
            ("offline", false),
            ("online", true),
        ];
        for (status, crosses_online) in steps {
            recorder.clear();
            let update = tracker.update_presence("u1", status, Map::new()).unwrap();
            assert!(update.changed, "{status} should be a change");
            let hit = recorder
                .channels()
                .iter()
                .any(|c| c == "presence:online_users");
            assert_eq!(hit, crosses_online, "transition to {status}");
            assert!(recorder.channels().contains(&"presence".to_string()));
        }
    }

    #[test]
    fn test_first_offline_update_is_silent() {
        let (tracker, recorder) = tracker();
        let update = tracker.update_presence("u1", "offline", Map::new()).unwrap();
        assert!(!update.changed);
        assert_eq!(update.previous_status, PresenceStatus::Offline);
        assert!(recorder.events().is_empty());
        assert_eq!(tracker.get_presence("u1").unwrap().status, PresenceStatus::Offline);
    }

    #[test]
    fn test_event_payload_carries_old_and_new_status() {
        let (tracker, recorder) = tracker();
        let mut metadata = Map::new();
        metadata.insert("device".into(), json!("laptop"));
        tracker.update_presence("u1", "away", metadata).unwrap();

        let event = &recorder.events()[0];
        assert_eq!(event.kind, EventKind::PresenceChanged);
        assert_eq!(event.user_id.as_deref(), Some("u1"));
        assert_eq!(event.data["old_status"], "offline");
        assert_eq!(event.data["new_status"], "away");
        assert_eq!(event.data["presence"]["metadata"]["device"], "laptop");
    }

    #[test]
    fn test_validation_errors() {
        let (tracker, _) = tracker();
        let err = tracker.update_presence("", "online", Map::new()).unwrap_err();
        assert!(err.has_code(codes::MISSING_USER_ID));
        let err = tracker.update_presence("u1", "", Map::new()).unwrap_err();
        assert!(err.has_code(codes::MISSING_STATUS));
        let err = tracker.update_presence("u1", "busy", Map::new()).unwrap_err();
        assert!(err.has_code(codes::INVALID_STATUS));
        assert!(tracker.get_presence("u1").is_err());
    }

    #[test]
    fn test_set_offline_is_idempotent() {
        let (tracker, recorder) = tracker();
        assert_eq!(
            tracker.set_offline("ghost").unwrap_err().kind,
            pulsehub_core::error::ErrorKind::NotFound
        );

        tracker.update_presence("u1", "online", Map::new()).unwrap();
        recorder.clear();

        let first = tracker.set_offline("u1").unwrap();
        assert!(first.changed);
        assert_eq!(first.previous_status, PresenceStatus::Online);
        assert_eq!(recorder.events().len(), 3);
        assert_eq!(recorder.events()[0].data["old_status"], "online");

        let second = tracker.set_offline("u1").unwrap();
        assert!(!second.changed);
        assert_eq!(recorder.events().len(), 3);
    }

    #[test]
    fn test_no_dispatcher_still_records_state() {
        let tracker = PresenceTracker::new(&PresenceConfig::default(), None);
        tracker.update_presence("u1", "online", Map::new()).unwrap();
        assert_eq!(tracker.get_online_users(), vec!["u1"]);
    }

    #[test]
    fn test_online_users_pagination() {
        let (tracker, _) = tracker();
        for i in 1..=7 {
            tracker.update_presence(&format!("u{i}"), "online", Map::new()).unwrap();
        }
        tracker.update_presence("x", "away", Map::new()).unwrap();

        let online = tracker.get_online_users();
        let page = PageRequest::new(Some(3), Some(6), 50, 500).paginate(online.clone());
        assert_eq!(page.items, vec!["u7"]);
        assert_eq!(page.total, 7);

        let page = PageRequest::new(Some(3), Some(7), 50, 500).paginate(online);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 7);

        assert_eq!(tracker.get_presence_by_status(PresenceStatus::Away), vec!["x"]);
    }

    #[test]
    fn test_history_is_newest_first_and_bounded() {
        let recorder = Arc::new(RecordingDispatcher::default());
        let config = PresenceConfig {
            history_limit: 3,
            ..PresenceConfig::default()
        };
        let tracker = PresenceTracker::new(&config, Some(recorder as Arc<dyn EventDispatcher>));
        for status in ["online", "away", "away", "idle", "online", "offline"] {
            tracker.update_presence("u1", status, Map::new()).unwrap();
        }

        let page = tracker.get_presence_history("u1", PageRequest::new(Some(10), None, 20, 500));
        assert_eq!(page.total, 3);
        let transitions: Vec<_> = page
            .items
            .iter()
            .map(|t| (t.from_status, t.to_status))
            .collect();
        assert_eq!(
            transitions,
            vec![
                (PresenceStatus::Online, PresenceStatus::Offline),
                (PresenceStatus::Idle, PresenceStatus::Online),
                (PresenceStatus::Away, PresenceStatus::Idle),
            ]
        );
        assert_eq!(
            tracker
                .get_presence_history("nobody", PageRequest::default())
                .total,
            0
        );
    }

    #[test]
    fn test_evict_stale_respects_threshold() {
        let (tracker, recorder) = tracker();
        tracker.update_presence("old", "online", Map::new()).unwrap();
        tracker.update_presence("recent", "away", Map::new()).unwrap();
        tracker.update_presence("gone", "offline", Map::new()).unwrap();
        tracker.backdate("old", Duration::minutes(31));
        tracker.backdate("recent", Duration::minutes(29));
        tracker.backdate("gone", Duration::minutes(90));
        recorder.clear();

        let evicted = tracker.evict_stale(Duration::minutes(30));
        assert_eq!(evicted, 1);
        assert_eq!(tracker.get_presence("old").unwrap().status, PresenceStatus::Offline);
        assert_eq!(tracker.get_presence("recent").unwrap().status, PresenceStatus::Away);
        assert_eq!(
            recorder.channels(),
            vec!["presence:old", "presence:online_users", "presence"]
        );
    }

    #[test]
    fn test_sweep_never_clobbers_newer_update() {
        let (tracker, _) = tracker();
        tracker.update_presence("u1", "online", Map::new()).unwrap();
        tracker.backdate("u1", Duration::minutes(45));

        let candidates = tracker.stale_candidates(Utc::now() - Duration::minutes(30));
        assert_eq!(candidates.len(), 1);

        tracker.update_presence("u1", "online", Map::new()).unwrap();

        let (user_id, version) = &candidates[0];
        assert!(!tracker.evict_candidate(user_id, *version));
        assert_eq!(tracker.get_presence("u1").unwrap().status, PresenceStatus::Online);
    }

    #[test]
    fn test_concurrent_updates_keep_history_and_events_in_step() {
        let recorder = Arc::new(RecordingDispatcher::default());
        let config = PresenceConfig {
            history_limit: 10_000,
            ..PresenceConfig::default()
        };
        let tracker = PresenceTracker::new(
            &config,
            Some(recorder.clone() as Arc<dyn EventDispatcher>),
        );
        tracker.update_presence("shared", "online", Map::new()).unwrap();
        recorder.clear();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let tracker = &tracker;
                scope.spawn(move || {
                    for i in 0..200 {
                        let status = if (worker + i) % 2 == 0 { "online" } else { "away" };
                        tracker.update_presence("shared", status, Map::new()).unwrap();
                    }
                });
            }
        });

        let transitions = tracker
            .get_presence_history("shared", PageRequest::new(Some(10_000), None, 20, 10_000))
            .total;
        let user_events = recorder
            .channels()
            .iter()
            .filter(|c| c.as_str() == "presence:shared")
            .count();
        assert_eq!(transitions, user_events + 1);
        let online_events = recorder
            .channels()
            .iter()
            .filter(|c| c.as_str() == "presence:online_users")
            .count();
        assert_eq!(online_events, user_events);
    }

    /// Holds the first dispatch after arming until the test has started a
    /// competing writer.
    #[derive(Default)]
    struct StallingDispatcher {
        entered: std::sync::Mutex<Option<std::sync::mpsc::Sender<()>>>,
        recorder: RecordingDispatcher,
    }

    impl EventDispatcher for StallingDispatcher {
        fn dispatch(&self, event: Event) {
            if let Some(entered) = self.entered.lock().unwrap().take() {
                entered.send(()).unwrap();
                std::thread::sleep(std::time::Duration::from_millis(50));
            }
            self.recorder.dispatch(event);
        }
    }

    #[test]
    fn test_user_events_follow_write_order_under_contention() {
        let dispatcher = Arc::new(StallingDispatcher::default());
        let tracker = PresenceTracker::new(
            &PresenceConfig::default(),
            Some(dispatcher.clone() as Arc<dyn EventDispatcher>),
        );
        tracker.update_presence("u1", "online", Map::new()).unwrap();
        dispatcher.recorder.clear();

        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        *dispatcher.entered.lock().unwrap() = Some(entered_tx);

        std::thread::scope(|scope| {
            let tracker = &tracker;
            scope.spawn(move || tracker.update_presence("u1", "away", Map::new()).unwrap());
            entered_rx.recv().unwrap();
            scope.spawn(move || tracker.update_presence("u1", "online", Map::new()).unwrap());
        });

        let sequence: Vec<String> = dispatcher
            .recorder
            .events()
            .into_iter()
            .filter(|e| e.channel == "presence:u1")
            .map(|e| e.data["new_status"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(sequence, vec!["away", "online"]);
        let last = sequence.last().unwrap();
        assert_eq!(
            PresenceStatus::parse(last).unwrap(),
            tracker.get_presence("u1").unwrap().status
        );
    }
}
