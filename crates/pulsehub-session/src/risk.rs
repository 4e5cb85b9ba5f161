//! Risk scoring for sessions.
//!
//! The tracker only depends on [`RiskPolicy`]; the scoring formula is a
//! replaceable policy. [`HeuristicRiskPolicy`] is the default.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use pulsehub_core::config::session::RiskConfig;
use pulsehub_core::types::SessionId;

use crate::model::{Session, SessionActivity};

/// Result of scoring one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Session scored
    pub session_id: SessionId,
    /// Owning user
    pub user_id: String,
    /// Score in `[0, 1]`
    pub score: f64,
    /// Whether the score crossed the policy's threshold
    pub flagged: bool,
    /// Human-readable signals that contributed
    pub reasons: Vec<String>,
}

/// Scores a session from its own fields and its activity trail.
pub trait RiskPolicy: Send + Sync {
    /// Score `session`. `trail` is newest first.
    fn assess(
        &self,
        session: &Session,
        trail: &[SessionActivity],
        now: DateTime<Utc>,
    ) -> RiskAssessment;
}

const IP_CHURN_WEIGHT: f64 = 0.5;
const DEVICE_CHURN_WEIGHT: f64 = 0.25;
const LOCATION_CHANGE_WEIGHT: f64 = 0.25;
const VELOCITY_WEIGHT: f64 = 0.5;

/// Weighted sum of churn and velocity signals inside a look-back window.
#[derive(Debug, Clone)]
pub struct HeuristicRiskPolicy {
    config: RiskConfig,
}

impl HeuristicRiskPolicy {
    /// Create the policy from the `session.risk` config section.
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }
}

impl Default for HeuristicRiskPolicy {
    fn default() -> Self {
        Self::new(RiskConfig::default())
    }
}

impl RiskPolicy for HeuristicRiskPolicy {
    fn assess(
        &self,
        session: &Session,
        trail: &[SessionActivity],
        now: DateTime<Utc>,
    ) -> RiskAssessment {
        let window_start = now - Duration::minutes(self.config.window_minutes.max(1));
        let recent: Vec<&SessionActivity> = trail
            .iter()
            .filter(|a| a.created_at >= window_start)
            .collect();

        let mut ips: HashSet<&str> = HashSet::from([session.ip_address.as_str()]);
        let mut agents: HashSet<&str> = HashSet::from([session.user_agent.as_str()]);
        let mut locations: HashSet<&str> = session.location.as_deref().into_iter().collect();
        for activity in &recent {
            ips.insert(activity.ip_address.as_str());
            agents.insert(activity.user_agent.as_str());
            if let Some(location) = activity.location.as_deref() {
                locations.insert(location);
            }
        }

        let mut score = 0.0;
        let mut reasons = Vec::new();

        if ips.len() > self.config.max_distinct_ips.max(1) {
            score += IP_CHURN_WEIGHT;
            reasons.push(format!("{} distinct IP addresses", ips.len()));
        }
        if agents.len() > self.config.max_distinct_user_agents.max(1) {
            score += DEVICE_CHURN_WEIGHT;
            reasons.push(format!("{} distinct user agents", agents.len()));
        }
        if locations.len() > 1 {
            score += LOCATION_CHANGE_WEIGHT;
            reasons.push(format!(
                "{} locations within {} minutes",
                locations.len(),
                self.config.window_minutes
            ));
        }

        let last_minute = now - Duration::minutes(1);
        let per_minute = recent.iter().filter(|a| a.created_at >= last_minute).count();
        if per_minute as f64 > self.config.max_requests_per_minute {
            score += VELOCITY_WEIGHT;
            reasons.push(format!("{per_minute} requests in the last minute"));
        }

        let score: f64 = score.clamp(0.0, 1.0);
        RiskAssessment {
            session_id: session.id,
            user_id: session.user_id.clone(),
            score,
            flagged: score >= self.config.flag_threshold,
            reasons,
        }
    }
}
