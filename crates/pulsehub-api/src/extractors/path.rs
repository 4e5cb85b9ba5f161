//! Typed path parameter helpers.

use pulsehub_core::error::{AppError, codes};
use pulsehub_core::types::{ActivityId, SessionId};

/// Parses a session ID from a path segment.
pub fn parse_session_id(raw: &str) -> Result<SessionId, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::validation_code(
            codes::MISSING_SESSION_ID,
            "session id is required",
        ));
    }
    raw.parse().map_err(|_| {
        AppError::validation_code(
            codes::INVALID_SESSION_ID,
            format!("Invalid session id: {raw}"),
        )
    })
}

/// Parses an activity ID from a path segment.
pub fn parse_activity_id(raw: &str) -> Result<ActivityId, AppError> {
    raw.parse().map_err(|_| {
        AppError::validation_code(
            codes::INVALID_ACTIVITY_ID,
            format!("Invalid activity id: {raw}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_errors_carry_codes() {
        assert!(parse_session_id(" ").unwrap_err().has_code(codes::MISSING_SESSION_ID));
        assert!(parse_session_id("nope").unwrap_err().has_code(codes::INVALID_SESSION_ID));
        let id = SessionId::new();
        assert_eq!(parse_session_id(&id.to_string()).unwrap(), id);
    }
}
