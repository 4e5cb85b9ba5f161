//! # pulsehub-session
//!
//! Session tracking for PulseHub:
//!
//! - Session lifecycle (create, validate, extend, lock/unlock, kick, destroy)
//! - Per-session activity trails
//! - Pluggable risk scoring over IP, device and location history
//! - Aggregate views (geography, devices, concurrency, stats)
//! - Optional concurrent-session limits

pub mod device;
pub mod limiter;
pub mod model;
pub mod risk;
pub mod tracker;

pub use limiter::SessionLimiter;
pub use model::{NewSession, Session, SessionActivity, SessionActivityRequest, SessionState};
pub use risk::{HeuristicRiskPolicy, RiskAssessment, RiskPolicy};
pub use tracker::SessionTracker;
