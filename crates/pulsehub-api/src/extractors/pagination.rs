//! Pagination query parameter extractor.

use serde::{Deserialize, Serialize};

use pulsehub_core::types::PageRequest;

/// `limit`/`offset` query parameters for paginated endpoints.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PaginationParams {
    /// Page size. Missing or zero uses the endpoint default.
    pub limit: Option<usize>,
    /// Items to skip (default: 0).
    pub offset: Option<usize>,
}

impl PaginationParams {
    /// Resolves against an endpoint's default and cap.
    pub fn into_page_request(self, default_limit: usize, max_limit: usize) -> PageRequest {
        PageRequest::new(self.limit, self.offset, default_limit, max_limit)
    }
}

/// Per-endpoint `(default, cap)` page sizes.
pub mod limits {
    /// Presence listings
    pub const PRESENCE: (usize, usize) = (50, 500);
    /// Presence transition history
    pub const PRESENCE_HISTORY: (usize, usize) = (20, 500);
    /// Session listings
    pub const SESSIONS: (usize, usize) = (20, 500);
    /// Per-session activity trail
    pub const SESSION_ACTIVITY: (usize, usize) = (50, 500);
    /// Activity by user or resource
    pub const ACTIVITY: (usize, usize) = (50, 500);
    /// Recent activity feed
    pub const ACTIVITY_RECENT: (usize, usize) = (50, 5000);
}
