//! Core type definitions used across the PulseHub workspace.

pub mod id;
pub mod pagination;
pub mod response;
pub mod session_limit;

pub use id::{ActivityId, SessionId, SubscriptionId};
pub use pagination::{Page, PageRequest};
pub use session_limit::SessionLimit;
