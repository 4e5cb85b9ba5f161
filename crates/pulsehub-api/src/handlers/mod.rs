//! Request handlers, one module per resource.

pub mod activity;
pub mod health;
pub mod presence;
pub mod session;
