//! # pulsehub-api
//!
//! HTTP API layer for PulseHub built on Axum.
//!
//! Provides the presence, session, activity and health endpoints, request
//! logging and CORS middleware, pagination extractors, DTOs, error mapping,
//! and the server bootstrap that wires trackers, the event bus and the
//! maintenance scheduler together.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::{ApiError, ApiResult};
pub use state::AppState;
