//! Query and result types shared by storage backends.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Publication filter for admin listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    /// Lenient parse: anything other than `active`/`inactive` means all.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("active") => Self::Active,
            Some("inactive") => Self::Inactive,
            _ => Self::All,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::All => None,
            Self::Active => Some(true),
            Self::Inactive => Some(false),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    /// Clamp user-supplied values: page >= 1, 1 <= limit <= [`MAX_PAGE_SIZE`].
    pub fn new(page: Option<u64>, limit: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1) * self.limit
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Admin listing query for services.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceQuery {
    pub pagination: Pagination,
    pub status: StatusFilter,
    /// Free-text search over title and descriptions.
    pub search: Option<String>,
    pub show_on_homepage: Option<bool>,
}

/// Admin listing query for banners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerQuery {
    pub pagination: Pagination,
    pub status: StatusFilter,
}

/// One entry of a reorder request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOrder {
    pub service_id: String,
    pub display_order: i32,
}

/// A page of records plus the unpaginated match count.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_clamps_inputs() {
        let p = Pagination::new(Some(0), Some(0));
        assert_eq!((p.page, p.limit), (1, 1));

        let p = Pagination::new(None, Some(1_000));
        assert_eq!((p.page, p.limit), (1, MAX_PAGE_SIZE));

        let p = Pagination::new(Some(3), Some(10));
        assert_eq!(p.skip(), 20);
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = Pagination::new(Some(1), Some(10));
        assert_eq!(p.total_pages(0), 0);
        assert_eq!(p.total_pages(10), 1);
        assert_eq!(p.total_pages(11), 2);
    }

    #[test]
    fn status_filter_is_lenient() {
        assert_eq!(StatusFilter::parse(Some("active")), StatusFilter::Active);
        assert_eq!(StatusFilter::parse(Some("inactive")), StatusFilter::Inactive);
        assert_eq!(StatusFilter::parse(Some("whatever")), StatusFilter::All);
        assert_eq!(StatusFilter::parse(None), StatusFilter::All);
        assert_eq!(StatusFilter::Inactive.as_flag(), Some(false));
    }
}
