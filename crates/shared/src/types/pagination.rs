//! Cursor pagination types for bucket listings.
//!
//! Object storage listings cannot be addressed by page number, so pages are
//! resumed from an opaque continuation token returned with the previous page.

use serde::{Deserialize, Serialize};

/// Request parameters for a cursor-paginated listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorRequest {
    /// Token returned as `nextToken` by the previous page.
    #[serde(default)]
    pub continuation_token: Option<String>,
    /// Requested number of entries.
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl CursorRequest {
    /// Returns the continuation token, treating an empty string as absent.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.continuation_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }

    /// Resolves the page size against the configured default and maximum.
    ///
    /// Returns `None` when the caller explicitly asked for zero entries.
    #[must_use]
    pub fn effective_page_size(&self, default: u32, max: u32) -> Option<u32> {
        match self.page_size {
            None => Some(default.clamp(1, max.max(1))),
            Some(0) => None,
            Some(size) => Some(size.min(max.max(1))),
        }
    }
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPage<T> {
    /// The items in the current page.
    pub objects: Vec<T>,
    /// Token the page was requested with.
    pub current_token: Option<String>,
    /// Token to pass to fetch the following page.
    pub next_token: Option<String>,
    /// Whether more entries follow this page.
    pub has_more: bool,
}
