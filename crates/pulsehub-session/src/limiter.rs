//! Concurrent-session limits applied in front of session creation.

use std::sync::Mutex;

use tracing::info;

use pulsehub_core::config::session::{OverflowStrategy, SessionLimitsConfig};
use pulsehub_core::error::{AppError, codes};
use pulsehub_core::result::AppResult;
use pulsehub_core::types::SessionLimit;

use crate::model::{NewSession, Session};
use crate::tracker::SessionTracker;

/// Enforces the per-user session cap and its overflow strategy.
#[derive(Debug)]
pub struct SessionLimiter {
    limit: SessionLimit,
    strategy: OverflowStrategy,
    /// Serializes count-then-create so two logins cannot both take the last slot
    admission: Mutex<()>,
}

impl SessionLimiter {
    /// Creates a limiter from configuration. `max_per_user = 0` disables it.
    pub fn new(config: &SessionLimitsConfig) -> Self {
        Self {
            limit: SessionLimit::from(config.max_per_user),
            strategy: config.overflow_strategy,
            admission: Mutex::new(()),
        }
    }

    /// The effective per-user limit.
    pub fn limit(&self) -> SessionLimit {
        self.limit
    }

    /// The configured overflow strategy.
    pub fn overflow_strategy(&self) -> OverflowStrategy {
        self.strategy
    }

    /// Creates a session through `tracker`, applying the limit first.
    ///
    /// With [`OverflowStrategy::Deny`] a user at the limit gets a conflict
    /// carrying `SESSION_LIMIT_REACHED`. With [`OverflowStrategy::KickOldest`]
    /// the user's oldest valid sessions are kicked until one slot is free.
    pub fn create_session(
        &self,
        tracker: &SessionTracker,
        request: NewSession,
    ) -> AppResult<Session> {
        let SessionLimit::Fixed(max) = self.limit else {
            return tracker.create_session(request);
        };

        let _guard = self
            .admission
            .lock()
            .map_err(|_| AppError::internal("Session admission lock poisoned"))?;

        let user_id = request.user_id.trim().to_string();
        let existing = tracker.valid_user_sessions(&user_id);
        if self.limit.is_exceeded_by(existing.len()) {
            match self.strategy {
                OverflowStrategy::Deny => {
                    return Err(AppError::conflict(format!(
                        "Maximum concurrent sessions ({max}) reached"
                    ))
                    .with_code(codes::SESSION_LIMIT_REACHED));
                }
                OverflowStrategy::KickOldest => {
                    let excess = existing.len() + 1 - max as usize;
                    for oldest in existing.iter().take(excess) {
                        info!(
                            user_id = %user_id,
                            kicked_session = %oldest.id,
                            "Kicking oldest session due to overflow"
                        );
                        tracker.kick_session(oldest.id)?;
                    }
                }
            }
        }

        tracker.create_session(request)
    }
}
