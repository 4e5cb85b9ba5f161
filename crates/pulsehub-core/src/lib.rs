//! # pulsehub-core
//!
//! Core crate for PulseHub. Contains configuration schemas, typed
//! identifiers, the transient event model, limit/offset pagination,
//! the dispatcher seam, and the unified error system.
//!
//! This crate has **no** internal dependencies on other PulseHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
