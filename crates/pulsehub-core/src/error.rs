//! Unified application error types for PulseHub.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// Authentication failed or a credential is no longer usable.
    Authentication,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (limit reached, concurrent modification, etc.).
    Conflict,
    /// An internal server error occurred.
    Internal,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
        }
    }
}

/// Machine-readable error codes attached to validation failures.
pub mod codes {
    /// `user_id` was empty or absent.
    pub const MISSING_USER_ID: &str = "MISSING_USER_ID";
    /// `status` was empty or absent.
    pub const MISSING_STATUS: &str = "MISSING_STATUS";
    /// `status` is not a known presence status.
    pub const INVALID_STATUS: &str = "INVALID_STATUS";
    /// A session id path or body field was empty.
    pub const MISSING_SESSION_ID: &str = "MISSING_SESSION_ID";
    /// A session id could not be parsed.
    pub const INVALID_SESSION_ID: &str = "INVALID_SESSION_ID";
    /// An activity id could not be parsed.
    pub const INVALID_ACTIVITY_ID: &str = "INVALID_ACTIVITY_ID";
    /// `action` was empty or absent.
    pub const MISSING_ACTION: &str = "MISSING_ACTION";
    /// `ip_address` is not a valid IPv4/IPv6 address.
    pub const INVALID_IP_ADDRESS: &str = "INVALID_IP_ADDRESS";
    /// A duration was zero, negative or out of range.
    pub const INVALID_DURATION: &str = "INVALID_DURATION";
    /// The session is expired or destroyed.
    pub const SESSION_NOT_ACTIVE: &str = "SESSION_NOT_ACTIVE";
    /// The session is locked.
    pub const SESSION_LOCKED: &str = "SESSION_LOCKED";
    /// The user already holds the maximum number of sessions.
    pub const SESSION_LIMIT_REACHED: &str = "SESSION_LIMIT_REACHED";
    /// A request body failed declarative validation.
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
}

/// The unified application error used throughout PulseHub.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. An optional `code` carries a stable,
/// machine-readable identifier (see [`codes`]) that the HTTP layer returns
/// to clients in place of the generic kind.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// Optional machine-readable code.
    pub code: Option<String>,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Attach a machine-readable code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a validation error carrying a machine-readable code.
    pub fn validation_code(code: &str, message: impl Into<String>) -> Self {
        Self::validation(message).with_code(code)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// The code reported to clients: the explicit code, or the kind.
    pub fn error_code(&self) -> String {
        self.code.clone().unwrap_or_else(|| self.kind.to_string())
    }

    /// Whether this error carries the given code.
    pub fn has_code(&self, code: &str) -> bool {
        self.code.as_deref() == Some(code)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            code: self.code.clone(),
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
