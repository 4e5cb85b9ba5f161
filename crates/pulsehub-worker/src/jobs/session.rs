//! Session maintenance jobs: purging ended sessions and scoring live ones.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing;

use pulsehub_session::SessionTracker;

use crate::executor::{JobExecutionError, JobHandler};

/// Handles the `session_cleanup` job
#[derive(Debug)]
pub struct SessionCleanupHandler {
    /// Session tracker to purge
    sessions: Arc<SessionTracker>,
}

impl SessionCleanupHandler {
    /// Create a new session cleanup handler
    pub fn new(sessions: Arc<SessionTracker>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl JobHandler for SessionCleanupHandler {
    fn job_type(&self) -> &str {
        "session_cleanup"
    }

    async fn execute(&self) -> Result<Option<Value>, JobExecutionError> {
        tracing::debug!("Running session cleanup");
        let purged = self.sessions.cleanup_expired();

        Ok(Some(serde_json::json!({
            "task": "session_cleanup",
            "purged": purged,
            "retention_minutes": self.sessions.config().retention_minutes,
        })))
    }
}

/// Handles the `risk_scan` job
#[derive(Debug)]
pub struct RiskScanHandler {
    /// Session tracker to score
    sessions: Arc<SessionTracker>,
}

impl RiskScanHandler {
    /// Create a new risk scan handler
    pub fn new(sessions: Arc<SessionTracker>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl JobHandler for RiskScanHandler {
    fn job_type(&self) -> &str {
        "risk_scan"
    }

    async fn execute(&self) -> Result<Option<Value>, JobExecutionError> {
        tracing::debug!("Running suspicious session scan");
        let flagged = self.sessions.detect_suspicious_activity();
        for assessment in &flagged {
            tracing::warn!(
                session_id = %assessment.session_id,
                user_id = %assessment.user_id,
                score = assessment.score,
                reasons = ?assessment.reasons,
                "Session flagged as suspicious"
            );
        }

        Ok(Some(serde_json::json!({
            "task": "risk_scan",
            "flagged": flagged.len(),
        })))
    }
}
