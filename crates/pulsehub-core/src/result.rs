//! Convenience result type alias for PulseHub.

use crate::error::AppError;

/// A specialized `Result` type for PulseHub operations.
pub type AppResult<T> = Result<T, AppError>;
