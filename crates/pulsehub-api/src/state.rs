//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use pulsehub_core::config::AppConfig;
use pulsehub_core::result::AppResult;
use pulsehub_core::traits::EventDispatcher;
use pulsehub_realtime::{
    ActivityBroadcaster, ActivityLogStore, ActivityPolicy, EventBus, MemoryActivityLog,
    PresenceTracker,
};
use pulsehub_session::{HeuristicRiskPolicy, SessionLimiter, SessionTracker};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Realtime ─────────────────────────────────────────────
    /// In-process event bus every tracker publishes to
    pub event_bus: Arc<EventBus>,
    /// Per-user presence
    pub presence: Arc<PresenceTracker>,
    /// Activity logging and broadcast
    pub activity: Arc<ActivityBroadcaster>,

    // ── Sessions ─────────────────────────────────────────────
    /// Session lifecycle tracker
    pub sessions: Arc<SessionTracker>,
    /// Concurrent-session limit policy
    pub session_limiter: Arc<SessionLimiter>,

    /// Server start time
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Builds every tracker from configuration, all publishing to one bus.
    ///
    /// The bus is returned idle; call [`EventBus::start`] to begin delivery.
    pub fn from_config(config: AppConfig) -> AppResult<Self> {
        let event_bus = Arc::new(EventBus::new(&config.event_bus));
        let dispatcher: Arc<dyn EventDispatcher> = event_bus.clone();

        let presence = Arc::new(PresenceTracker::new(
            &config.presence,
            Some(Arc::clone(&dispatcher)),
        ));

        let store: Arc<dyn ActivityLogStore> =
            Arc::new(MemoryActivityLog::new(config.activity.log_capacity));
        let activity = Arc::new(ActivityBroadcaster::new(
            store,
            ActivityPolicy::from_config(&config.activity)?,
            Some(Arc::clone(&dispatcher)),
        ));

        let sessions = Arc::new(SessionTracker::new(
            config.session.clone(),
            Arc::new(HeuristicRiskPolicy::new(config.session.risk.clone())),
            Some(dispatcher),
        ));
        let session_limiter = Arc::new(SessionLimiter::new(&config.session.limits));

        Ok(Self {
            config: Arc::new(config),
            event_bus,
            presence,
            activity,
            sessions,
            session_limiter,
            started_at: Utc::now(),
        })
    }

    /// Whole seconds since startup.
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
