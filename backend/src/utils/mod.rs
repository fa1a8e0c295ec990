//! Small helpers shared across the API layer.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

/// Parses a path segment into an [`ObjectId`], turning garbage input into a
/// 400 instead of a server error.
pub fn parse_object_id(raw: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid id: {raw}")))
}

const DEFAULT_PAGE_LIMIT: i64 = 10;
const MAX_PAGE_LIMIT: i64 = 100;
// Keeps page * limit far away from i64 overflow on hostile input.
const MAX_PAGE: i64 = 1_000_000;

/// Raw `?page=&limit=` query parameters, before clamping.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

impl PageQuery {
    /// Sort direction as the integer MongoDB expects; descending by default.
    pub fn sort_direction(&self) -> i32 {
        match self.order.as_deref() {
            Some("asc") => 1,
            _ => -1,
        }
    }

    /// Search term, ignored when shorter than two characters.
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| s.len() >= 2)
    }
}

/// Clamped pagination window derived from a [`PageQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn from_query(query: &PageQuery) -> Self {
        let page = query.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        Self { page, limit }
    }

    pub fn skip(&self) -> u64 {
        ((self.page - 1) * self.limit) as u64
    }

    pub fn info(&self, total: u64) -> PageInfo {
        let pages = (total as i64 + self.limit - 1) / self.limit;
        PageInfo {
            page: self.page,
            limit: self.limit,
            total,
            pages,
        }
    }
}

/// Pagination metadata returned alongside listings.
#[derive(Debug, Serialize)]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: u64,
    pub pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults() {
        let p = Pagination::from_query(&PageQuery::default());
        assert_eq!(p, Pagination { page: 1, limit: 10 });
        assert_eq!(p.skip(), 0);
    }

    #[test]
    fn pagination_clamps_out_of_range_values() {
        let query = PageQuery {
            page: Some(0),
            limit: Some(500),
            ..Default::default()
        };
        let p = Pagination::from_query(&query);
        assert_eq!(p, Pagination { page: 1, limit: 100 });

        let query = PageQuery {
            page: Some(-3),
            limit: Some(0),
            ..Default::default()
        };
        let p = Pagination::from_query(&query);
        assert_eq!(p, Pagination { page: 1, limit: 1 });
    }

    #[test]
    fn pagination_caps_huge_page_numbers() {
        let query = PageQuery {
            page: Some(i64::MAX),
            limit: Some(100),
            ..Default::default()
        };
        let p = Pagination::from_query(&query);
        assert_eq!(p.page, MAX_PAGE);
        assert_eq!(p.skip(), ((MAX_PAGE - 1) * 100) as u64);
    }

    #[test]
    fn page_info_rounds_up() {
        let p = Pagination { page: 2, limit: 10 };
        assert_eq!(p.skip(), 10);
        let info = p.info(25);
        assert_eq!(info.pages, 3);
        assert_eq!(info.total, 25);
    }

    #[test]
    fn object_id_parsing() {
        assert!(parse_object_id("507f1f77bcf86cd799439011").is_ok());
        assert!(parse_object_id("not-an-id").is_err());
    }
}
