//! Limit/offset pagination for list endpoints.
//!
//! Every list operation computes its full result first and slices it here,
//! so `total` always reflects the pre-pagination count.

use serde::{Deserialize, Serialize};

/// A resolved limit/offset window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Maximum number of items returned.
    pub limit: usize,
    /// Number of items skipped.
    pub offset: usize,
}

impl PageRequest {
    /// Resolve raw query values against an endpoint's default and cap.
    ///
    /// A missing or zero limit falls back to `default_limit`; anything above
    /// `max_limit` is clamped.
    pub fn new(
        limit: Option<usize>,
        offset: Option<usize>,
        default_limit: usize,
        max_limit: usize,
    ) -> Self {
        let limit = match limit {
            Some(0) | None => default_limit,
            Some(l) => l.min(max_limit),
        };
        Self {
            limit,
            offset: offset.unwrap_or(0),
        }
    }

    /// Apply this window to a fully materialized list.
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let items = items
            .into_iter()
            .skip(self.offset)
            .take(self.limit)
            .collect();
        Page {
            items,
            total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

/// One page of a list result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Total number of items before pagination.
    pub total: usize,
    /// The limit that was applied.
    pub limit: usize,
    /// The offset that was applied.
    pub offset: usize,
}

impl<T> Page<T> {
    /// Transform the items while keeping the window.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
