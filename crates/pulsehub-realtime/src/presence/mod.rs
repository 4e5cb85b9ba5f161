//! User presence tracking: status, transition history, and stale eviction.

pub mod status;
pub mod tracker;
