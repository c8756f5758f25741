//! # Pagination Utilities
//!
//! Offset pagination shared by every list endpoint. Handlers pass the raw
//! `page`/`limit` query values through [`Pagination::calculate`] and attach
//! the result to the response envelope.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Default number of items per page when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Hard ceiling on items per page, applied before any query runs.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Clamp a requested page number to at least 1.
pub fn clamp_page(page: Option<u64>) -> u64 {
    page.unwrap_or(1).max(1)
}

/// Clamp a requested page size into `1..=MAX_PAGE_SIZE`, defaulting to
/// [`DEFAULT_PAGE_SIZE`] when absent.
pub fn clamp_limit(limit: Option<u64>) -> u64 {
    limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE)
}

/// Pagination block attached to list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    /// Page that was served (1-based)
    pub current_page: u64,
    /// Items per page after clamping
    pub per_page: u64,
    /// Total matching items across all pages
    pub total_items: u64,
    /// Total number of pages
    pub total_pages: u64,
    /// Whether a later page exists
    pub has_next: bool,
    /// Whether an earlier page exists
    pub has_prev: bool,
}

impl Pagination {
    /// Build pagination metadata from raw query values and a total count.
    ///
    /// A page beyond the last one yields valid metadata with `has_next`
    /// false; the caller still runs the query and gets an empty slice.
    pub fn calculate(page: Option<u64>, limit: Option<u64>, total_items: u64) -> Self {
        let current_page = clamp_page(page);
        let per_page = clamp_limit(limit);
        let total_pages = total_items.div_ceil(per_page);

        Self {
            current_page,
            per_page,
            total_items,
            total_pages,
            has_next: current_page < total_pages,
            has_prev: current_page > 1,
        }
    }

    /// Row offset for the underlying query.
    pub fn offset(&self) -> u64 {
        (self.current_page - 1) * self.per_page
    }
}
