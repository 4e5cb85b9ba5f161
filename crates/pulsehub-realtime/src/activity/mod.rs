//! User-level activity logging and its broadcast policy.

pub mod broadcaster;
pub mod model;
pub mod policy;
pub mod store;
