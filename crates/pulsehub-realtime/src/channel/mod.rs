//! Channel naming, listener adapters, and the subscription registry.

pub mod channel;
pub mod listener;
pub mod registry;
pub mod subscription;
pub mod types;
