//! Session tracker: lifecycle, lock/kick controls, activity trails and
//! aggregate views.
//!
//! Locking discipline: a session's read-modify-write runs while holding its
//! `sessions` entry. The `by_user` index is only touched when no session
//! entry is held, so the two maps are never locked together. Lifecycle
//! events are dispatched while the session's entry is still held, so each
//! session's events follow its write order.
//!
//! Purged sessions leave a tombstone holding their final state until the
//! following cleanup, so kicking them stays a no-op.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use pulsehub_core::config::session::SessionConfig;
use pulsehub_core::error::{AppError, codes};
use pulsehub_core::events::{Event, EventKind};
use pulsehub_core::result::AppResult;
use pulsehub_core::traits::EventDispatcher;
use pulsehub_core::types::{ActivityId, Page, PageRequest, SessionId};
use pulsehub_realtime::channel::types::ChannelType;

use crate::device::DeviceClass;
use crate::model::{
    ConcurrentUsers, DeviceStats, GeoBucket, NewSession, Session, SessionActivity,
    SessionActivityRequest, SessionState, SessionStats,
};
use crate::risk::{RiskAssessment, RiskPolicy};

const UNKNOWN_LOCATION: &str = "unknown";

#[derive(Debug)]
struct SessionEntry {
    session: Session,
    /// Newest first
    trail: VecDeque<SessionActivity>,
}

#[derive(Debug)]
struct Tombstone {
    /// Final state at purge time
    session: Session,
    purged_at: DateTime<Utc>,
}

/// Tracks every session until it is purged after ending.
pub struct SessionTracker {
    /// Session ID → session and its activity trail
    sessions: DashMap<SessionId, SessionEntry>,
    /// User ID → that user's session IDs
    by_user: DashMap<String, BTreeSet<SessionId>>,
    /// Recently purged sessions
    tombstones: DashMap<SessionId, Tombstone>,
    /// Highest concurrent user count sampled
    peak_concurrent: AtomicUsize,
    config: SessionConfig,
    risk_policy: Arc<dyn RiskPolicy>,
    dispatcher: Option<Arc<dyn EventDispatcher>>,
}

impl std::fmt::Debug for SessionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTracker")
            .field("sessions", &self.sessions.len())
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher.is_some())
            .finish()
    }
}

impl SessionTracker {
    /// Creates a tracker. With no dispatcher, lifecycle changes are not
    /// broadcast.
    pub fn new(
        config: SessionConfig,
        risk_policy: Arc<dyn RiskPolicy>,
        dispatcher: Option<Arc<dyn EventDispatcher>>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            by_user: DashMap::new(),
            tombstones: DashMap::new(),
            peak_concurrent: AtomicUsize::new(0),
            config,
            risk_policy,
            dispatcher,
        }
    }

    /// The configuration in force.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -- lifecycle --------------------------------------------------------

    /// Creates a session with a fresh ID, token, and the default lifetime.
    pub fn create_session(&self, request: NewSession) -> AppResult<Session> {
        let user_id = require_user_id(&request.user_id)?;
        let ip_address = parse_ip(&request.ip_address)?;
        let now = Utc::now();

        let session = Session {
            id: SessionId::new(),
            user_id: user_id.to_string(),
            token: Uuid::new_v4().simple().to_string(),
            ip_address: ip_address.to_string(),
            user_agent: request.user_agent.trim().to_string(),
            location: non_empty(request.location),
            created_at: now,
            expires_at: now + Duration::minutes(self.config.default_ttl_minutes as i64),
            last_activity: now,
            locked: false,
            risk_score: 0.0,
            flagged: false,
            destroyed_at: None,
            destroyed_reason: None,
        };

        self.sessions.insert(
            session.id,
            SessionEntry {
                session: session.clone(),
                trail: VecDeque::new(),
            },
        );
        self.by_user
            .entry(session.user_id.clone())
            .or_default()
            .insert(session.id);

        info!(
            session_id = %session.id,
            user_id = %session.user_id,
            ip_address = %session.ip_address,
            "Session created"
        );
        self.publish(EventKind::SessionCreated, &session, None);
        Ok(session)
    }

    /// Returns a session in any state until it is purged.
    pub fn get_session(&self, id: SessionId) -> AppResult<Session> {
        self.sessions
            .get(&id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| not_found(id))
    }

    /// True only if the session exists, is unlocked and has not expired or
    /// been destroyed.
    pub fn validate_session(&self, id: SessionId) -> bool {
        self.sessions
            .get(&id)
            .is_some_and(|entry| entry.session.is_valid_at(Utc::now()))
    }

    /// Pushes expiry forward to at least `now + duration`. Expiry never
    /// moves backward.
    pub fn extend_session(
        &self,
        id: SessionId,
        duration_seconds: Option<i64>,
    ) -> AppResult<Session> {
        let seconds = duration_seconds.unwrap_or(self.config.default_extension_seconds);
        if seconds <= 0 {
            return Err(AppError::validation_code(
                codes::INVALID_DURATION,
                "duration_seconds must be positive",
            ));
        }
        let seconds = seconds.min(self.config.max_extension_seconds.max(1));

        let session = self.mutate(id, |session, now| {
            require_not_terminal(session, now)?;
            let target = now + Duration::seconds(seconds);
            if target > session.expires_at {
                session.expires_at = target;
            }
            Ok(Some(EventKind::SessionExtended))
        })?;

        debug!(session_id = %id, expires_at = %session.expires_at, "Session extended");
        Ok(session)
    }

    /// Locks a session so validation fails until it is unlocked.
    /// Locking an already locked session is a no-op.
    pub fn lock_session(&self, id: SessionId) -> AppResult<Session> {
        self.set_locked(id, true)
    }

    /// Unlocks a session. Unlocking an unlocked session is a no-op.
    pub fn unlock_session(&self, id: SessionId) -> AppResult<Session> {
        self.set_locked(id, false)
    }

    /// Destroys a session immediately. Kicking a destroyed session succeeds
    /// without doing anything.
    pub fn kick_session(&self, id: SessionId) -> AppResult<Session> {
        self.terminate(id, "kicked")
    }

    /// Ends a session at the owner's request. Same semantics as
    /// [`kick_session`](Self::kick_session).
    pub fn destroy_session(&self, id: SessionId) -> AppResult<Session> {
        self.terminate(id, "destroyed")
    }

    /// Kicks every session of a user. Returns how many were newly
    /// destroyed.
    pub fn kick_user(&self, user_id: &str) -> AppResult<usize> {
        self.terminate_user(user_id, "kicked")
    }

    /// Ends every session of a user at their request. Same semantics as
    /// [`kick_user`](Self::kick_user) with reason `destroyed`.
    pub fn destroy_user_sessions(&self, user_id: &str) -> AppResult<usize> {
        self.terminate_user(user_id, "destroyed")
    }

    // -- activity trail ---------------------------------------------------

    /// Appends to a session's activity trail. Locked and ended sessions
    /// are rejected.
    pub fn log_activity(
        &self,
        id: SessionId,
        request: SessionActivityRequest,
    ) -> AppResult<SessionActivity> {
        let action = request.action.trim();
        if action.is_empty() {
            return Err(AppError::validation_code(
                codes::MISSING_ACTION,
                "action is required",
            ));
        }
        let ip_override = match request.ip_address.as_deref().map(str::trim) {
            Some(ip) if !ip.is_empty() => Some(parse_ip(ip)?.to_string()),
            _ => None,
        };

        let mut entry = self.sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        let now = Utc::now();
        match entry.session.state_at(now) {
            SessionState::Active => {}
            SessionState::Locked => {
                return Err(AppError::validation_code(
                    codes::SESSION_LOCKED,
                    format!("Session {id} is locked"),
                ));
            }
            SessionState::Expired | SessionState::Destroyed => {
                return Err(not_active(id));
            }
        }

        let location = non_empty(request.location);
        let activity = SessionActivity {
            id: ActivityId::new(),
            session_id: id,
            user_id: entry.session.user_id.clone(),
            action: action.to_string(),
            resource: non_empty(request.resource),
            ip_address: ip_override.unwrap_or_else(|| entry.session.ip_address.clone()),
            user_agent: non_empty(request.user_agent)
                .unwrap_or_else(|| entry.session.user_agent.clone()),
            location: location.clone(),
            metadata: request.metadata,
            created_at: now,
        };

        entry.session.last_activity = now;
        if location.is_some() {
            entry.session.location = location;
        }
        entry.trail.push_front(activity.clone());
        let limit = self.config.activity_history_limit.max(1);
        entry.trail.truncate(limit);
        Ok(activity)
    }

    /// A session's activity trail, newest first.
    pub fn get_activity_history(
        &self,
        id: SessionId,
        page: PageRequest,
    ) -> AppResult<Page<SessionActivity>> {
        let trail: Vec<SessionActivity> = self
            .sessions
            .get(&id)
            .map(|entry| entry.trail.iter().cloned().collect())
            .ok_or_else(|| not_found(id))?;
        Ok(page.paginate(trail))
    }

    // -- risk -------------------------------------------------------------

    /// Scores every unended session with the configured policy, stores the
    /// scores, and returns the flagged assessments, riskiest first.
    pub fn detect_suspicious_activity(&self) -> Vec<RiskAssessment> {
        let now = Utc::now();
        let mut flagged: Vec<RiskAssessment> = Vec::new();
        for mut entry in self.sessions.iter_mut() {
            let SessionEntry { session, trail } = &mut *entry;
            if session.state_at(now).is_terminal() {
                continue;
            }
            let assessment = self.risk_policy.assess(session, trail.make_contiguous(), now);
            session.risk_score = assessment.score;
            session.flagged = assessment.flagged;
            if assessment.flagged {
                flagged.push(assessment);
            }
        }
        flagged.sort_by(|a, b| b.score.total_cmp(&a.score));
        if !flagged.is_empty() {
            warn!(flagged = flagged.len(), "Suspicious sessions detected");
        }
        flagged
    }

    /// Flagged, unended sessions, riskiest first.
    pub fn get_risky_sessions(&self, page: PageRequest) -> Page<Session> {
        let now = Utc::now();
        let mut risky = self.collect(|s| s.flagged && !s.state_at(now).is_terminal());
        risky.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
        page.paginate(risky)
    }

    // -- aggregate views --------------------------------------------------

    /// Valid sessions and distinct users per location, busiest first.
    pub fn get_geographic_distribution(&self) -> Vec<GeoBucket> {
        let mut buckets: HashMap<String, (usize, HashSet<String>)> = HashMap::new();
        for session in self.valid_sessions() {
            let location = session
                .location
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
            let bucket = buckets.entry(location).or_default();
            bucket.0 += 1;
            bucket.1.insert(session.user_id);
        }
        let mut distribution: Vec<GeoBucket> = buckets
            .into_iter()
            .map(|(location, (sessions, users))| GeoBucket {
                location,
                sessions,
                users: users.len(),
            })
            .collect();
        distribution.sort_by(|a, b| {
            b.sessions
                .cmp(&a.sessions)
                .then_with(|| a.location.cmp(&b.location))
        });
        distribution
    }

    /// Valid sessions per device class.
    pub fn get_device_stats(&self) -> DeviceStats {
        let mut by_device = BTreeMap::new();
        let mut total = 0;
        for session in self.valid_sessions() {
            *by_device
                .entry(DeviceClass::from_user_agent(&session.user_agent))
                .or_insert(0) += 1;
            total += 1;
        }
        DeviceStats { total, by_device }
    }

    /// Users with at least one valid session, sorted.
    pub fn get_online_users(&self) -> Vec<String> {
        let users: BTreeSet<String> = self
            .valid_sessions()
            .into_iter()
            .map(|s| s.user_id)
            .collect();
        users.into_iter().collect()
    }

    /// Whether a user has at least one valid session.
    pub fn check_user_online_status(&self, user_id: &str) -> bool {
        let now = Utc::now();
        self.user_session_ids(user_id).into_iter().any(|id| {
            self.sessions
                .get(&id)
                .is_some_and(|entry| entry.session.is_valid_at(now))
        })
    }

    /// A user's sessions in every state, newest first.
    pub fn get_user_sessions(&self, user_id: &str, page: PageRequest) -> Page<Session> {
        let mut sessions: Vec<Session> = self
            .user_session_ids(user_id)
            .into_iter()
            .filter_map(|id| self.sessions.get(&id).map(|e| e.session.clone()))
            .collect();
        sort_newest_first(&mut sessions);
        page.paginate(sessions)
    }

    /// A user's valid sessions, oldest first.
    pub fn valid_user_sessions(&self, user_id: &str) -> Vec<Session> {
        let now = Utc::now();
        let mut sessions: Vec<Session> = self
            .user_session_ids(user_id)
            .into_iter()
            .filter_map(|id| self.sessions.get(&id).map(|e| e.session.clone()))
            .filter(|s| s.is_valid_at(now))
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        sessions
    }

    /// The user's most recently created valid session.
    pub fn current_session(&self, user_id: &str) -> AppResult<Session> {
        let user_id = require_user_id(user_id)?;
        self.valid_user_sessions(user_id).pop().ok_or_else(|| {
            AppError::not_found(format!("No active session for user '{user_id}'"))
        })
    }

    /// Current and peak concurrency. The peak is the highest count seen by
    /// this call or by a cleanup pass.
    pub fn get_concurrent_user_count(&self) -> ConcurrentUsers {
        let valid = self.valid_sessions();
        let users: HashSet<&str> = valid.iter().map(|s| s.user_id.as_str()).collect();
        let concurrent_users = users.len();
        let peak = self
            .peak_concurrent
            .fetch_max(concurrent_users, Ordering::Relaxed)
            .max(concurrent_users);
        ConcurrentUsers {
            concurrent_users,
            active_sessions: valid.len(),
            peak_concurrent_users: peak,
        }
    }

    /// Every tracked session, newest first.
    pub fn list_sessions(&self, page: PageRequest) -> Page<Session> {
        let mut sessions = self.collect(|_| true);
        sort_newest_first(&mut sessions);
        page.paginate(sessions)
    }

    /// Valid sessions, newest first.
    pub fn list_active_sessions(&self, page: PageRequest) -> Page<Session> {
        let mut sessions = self.valid_sessions();
        sort_newest_first(&mut sessions);
        page.paginate(sessions)
    }

    /// Counts per state plus mean lifetime of ended sessions.
    pub fn get_session_stats(&self) -> SessionStats {
        let now = Utc::now();
        let mut stats = SessionStats {
            total: 0,
            active: 0,
            locked: 0,
            expired: 0,
            destroyed: 0,
            average_duration_seconds: 0.0,
        };
        let mut ended_seconds = 0i64;
        let mut ended = 0i64;
        for entry in self.sessions.iter() {
            let session = &entry.session;
            stats.total += 1;
            match session.state_at(now) {
                SessionState::Active => stats.active += 1,
                SessionState::Locked => stats.locked += 1,
                SessionState::Expired => stats.expired += 1,
                SessionState::Destroyed => stats.destroyed += 1,
            }
            if let Some(end) = session.ended_at(now) {
                ended_seconds += (end - session.created_at).num_seconds().max(0);
                ended += 1;
            }
        }
        if ended > 0 {
            stats.average_duration_seconds = ended_seconds as f64 / ended as f64;
        }
        stats
    }

    // -- maintenance ------------------------------------------------------

    /// Purges sessions that ended more than `retention_minutes` ago.
    /// Returns the number purged.
    ///
    /// Each purged session leaves a tombstone that lives for another
    /// retention window.
    pub fn cleanup_expired(&self) -> usize {
        self.cleanup_expired_at(Utc::now())
    }

    /// [`cleanup_expired`](Self::cleanup_expired) measured from `now`.
    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        self.get_concurrent_user_count();
        let cutoff = now - Duration::minutes(self.config.retention_minutes as i64);
        self.tombstones.retain(|_, stone| stone.purged_at >= cutoff);

        let candidates: Vec<Session> = self
            .sessions
            .iter()
            .filter(|entry| entry.session.ended_at(now).is_some_and(|end| end < cutoff))
            .map(|entry| entry.session.clone())
            .collect();

        let mut purged = 0;
        for session in candidates {
            let id = session.id;
            // A concurrent kick must always find the session or its tombstone.
            self.tombstones.insert(
                id,
                Tombstone {
                    session,
                    purged_at: now,
                },
            );
            let removed = self.sessions.remove_if(&id, |_, entry| {
                entry.session.ended_at(now).is_some_and(|end| end < cutoff)
            });
            match removed {
                Some((_, entry)) => {
                    self.unindex(&entry.session.user_id, id);
                    self.tombstones.insert(
                        id,
                        Tombstone {
                            session: entry.session,
                            purged_at: now,
                        },
                    );
                    purged += 1;
                }
                None => {
                    self.tombstones.remove(&id);
                }
            }
        }
        if purged > 0 {
            info!(purged = purged, "Purged ended sessions");
        }
        purged
    }

    // -- internals --------------------------------------------------------

    fn set_locked(&self, id: SessionId, locked: bool) -> AppResult<Session> {
        let mut changed = false;
        let session = self.mutate(id, |session, now| {
            require_not_terminal(session, now)?;
            changed = session.locked != locked;
            session.locked = locked;
            let kind = if locked {
                EventKind::SessionLocked
            } else {
                EventKind::SessionUnlocked
            };
            Ok(changed.then_some(kind))
        })?;
        if changed {
            info!(session_id = %id, locked = locked, "Session lock changed");
        }
        Ok(session)
    }

    fn terminate_user(&self, user_id: &str, reason: &str) -> AppResult<usize> {
        let user_id = require_user_id(user_id)?;
        let mut terminated = 0;
        for id in self.user_session_ids(user_id) {
            match self.terminate_inner(id, reason) {
                Ok(Some(_)) => terminated += 1,
                Ok(None) => {}
                Err(e) => debug!(session_id = %id, error = %e, "Session vanished during kick"),
            }
        }
        info!(
            user_id = %user_id,
            reason = %reason,
            terminated = terminated,
            "Terminated user sessions"
        );
        Ok(terminated)
    }

    fn terminate(&self, id: SessionId, reason: &str) -> AppResult<Session> {
        match self.terminate_inner(id, reason)? {
            Some(session) => Ok(session),
            None => self
                .get_session(id)
                .or_else(|_| self.tombstone(id).ok_or_else(|| not_found(id))),
        }
    }

    /// Marks a session destroyed. `Ok(None)` means it already ended,
    /// including sessions purged since.
    fn terminate_inner(&self, id: SessionId, reason: &str) -> AppResult<Option<Session>> {
        let Some(mut entry) = self.sessions.get_mut(&id) else {
            if self.tombstones.contains_key(&id) {
                return Ok(None);
            }
            return Err(not_found(id));
        };
        if entry.session.destroyed_at.is_some() {
            return Ok(None);
        }
        entry.session.destroyed_at = Some(Utc::now());
        entry.session.destroyed_reason = Some(reason.to_string());
        let session = entry.session.clone();
        info!(session_id = %id, user_id = %session.user_id, reason = %reason, "Session terminated");
        self.publish(EventKind::SessionDestroyed, &session, Some(reason));
        Ok(Some(session))
    }

    /// Runs `f` against a session under its entry lock, publishes the event
    /// kind it returns, if any, and returns the updated copy.
    fn mutate<F>(&self, id: SessionId, f: F) -> AppResult<Session>
    where
        F: FnOnce(&mut Session, DateTime<Utc>) -> AppResult<Option<EventKind>>,
    {
        let mut entry = self.sessions.get_mut(&id).ok_or_else(|| not_found(id))?;
        let kind = f(&mut entry.session, Utc::now())?;
        let session = entry.session.clone();
        if let Some(kind) = kind {
            self.publish(kind, &session, None);
        }
        Ok(session)
    }

    fn tombstone(&self, id: SessionId) -> Option<Session> {
        self.tombstones.get(&id).map(|stone| stone.session.clone())
    }

    fn user_session_ids(&self, user_id: &str) -> Vec<SessionId> {
        self.by_user
            .get(user_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    fn unindex(&self, user_id: &str, id: SessionId) {
        if let Some(mut ids) = self.by_user.get_mut(user_id) {
            ids.remove(&id);
            if ids.is_empty() {
                drop(ids);
                self.by_user.remove_if(user_id, |_, ids| ids.is_empty());
            }
        }
    }

    fn collect(&self, keep: impl Fn(&Session) -> bool) -> Vec<Session> {
        self.sessions
            .iter()
            .filter(|entry| keep(&entry.session))
            .map(|entry| entry.session.clone())
            .collect()
    }

    fn valid_sessions(&self) -> Vec<Session> {
        let now = Utc::now();
        self.collect(|s| s.is_valid_at(now))
    }

    fn publish(&self, kind: EventKind, session: &Session, reason: Option<&str>) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };
        let mut data = json!({
            "session_id": session.id,
            "user_id": session.user_id,
            "state": session.state_at(Utc::now()),
            "expires_at": session.expires_at,
        });
        if let Some(reason) = reason {
            data["reason"] = json!(reason);
        }
        dispatcher.dispatch(
            Event::new(
                kind,
                ChannelType::SessionUser(session.user_id.clone()).to_channel_string(),
                data,
            )
            .with_user(session.user_id.clone()),
        );
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

fn parse_ip(raw: &str) -> AppResult<IpAddr> {
    raw.trim().parse::<IpAddr>().map_err(|_| {
        AppError::validation_code(
            codes::INVALID_IP_ADDRESS,
            format!("'{raw}' is not a valid IP address"),
        )
    })
}

fn require_not_terminal(session: &Session, now: DateTime<Utc>) -> AppResult<()> {
    if session.state_at(now).is_terminal() {
        return Err(not_active(session.id));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn sort_newest_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

fn not_found(id: SessionId) -> AppError {
    AppError::not_found(format!("Session {id} not found"))
}

fn not_active(id: SessionId) -> AppError {
    AppError::validation_code(
        codes::SESSION_NOT_ACTIVE,
        format!("Session {id} has expired or was destroyed"),
    )
}

#[cfg(test)]
impl SessionTracker {
    /// Moves a session's expiry into the past.
    pub(crate) fn force_expire(&self, id: SessionId, ago: Duration) {
        if let Some(mut entry) = self.sessions.get_mut(&id) {
            entry.session.expires_at = Utc::now() - ago;
        }
    }
}
