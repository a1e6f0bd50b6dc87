//! Page/limit normalization shared by paginated listings.
//!
//! # Invariants
//! - `page` is 1-based; absent or non-positive input means page 1.
//! - `limit` defaults to `DEFAULT_PAGE_LIMIT` when absent or non-positive.
//! - `total_pages = ceil(total / limit)`, so an empty table has 0 pages.

use serde::Serialize;

pub const DEFAULT_PAGE_LIMIT: u32 = 6;

/// Normalized page request.
///
/// Only constructible through `new`/`from_query`, so `page` and `limit` are
/// always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Normalizes raw (already integer-parsed) query values.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page
            .filter(|value| *value > 0)
            .map_or(1, |value| u32::try_from(value).unwrap_or(u32::MAX));
        let limit = limit
            .filter(|value| *value > 0)
            .map_or(DEFAULT_PAGE_LIMIT, |value| {
                u32::try_from(value).unwrap_or(u32::MAX)
            });
        Self { page, limit }
    }

    /// Parses raw query-string values; unparsable text falls back to defaults.
    pub fn from_query(page: Option<&str>, limit: Option<&str>) -> Self {
        let parse = |value: Option<&str>| value.and_then(|text| text.trim().parse::<i64>().ok());
        Self::new(parse(page), parse(limit))
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the figures needed to render a pager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            records,
            total,
            page: request.page(),
            limit: request.limit(),
            total_pages: total_pages(total, request.limit()),
        }
    }
}

pub fn total_pages(total: u64, limit: u32) -> u64 {
    total.div_ceil(u64::from(limit.max(1)))
}
