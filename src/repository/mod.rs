//! Repositories over the `PostgreSQL` schema in `migrations/`.
//!
//! Repository structs borrow the [`Database`](crate::db::Database) for pooled,
//! retry-wrapped reads and single-statement writes. Functions that take a
//! `&mut PgConnection` are building blocks for callers that hold a transaction.

pub mod addresses;
pub mod carts;
pub mod catalog;
pub mod customers;
pub mod orders;
pub mod pricing;
pub mod promos;
pub mod refunds;
pub mod reports;
pub mod reviews;
pub mod wishlist;

use serde::{Deserialize, Serialize};

use crate::CommerceError;

/// Replace the generic duplicate-entry message with one naming the entity.
pub(crate) fn conflict_as(e: impl Into<CommerceError>, message: &str) -> CommerceError {
    match e.into() {
        CommerceError::Conflict(_) => CommerceError::Conflict(message.to_string()),
        other => other,
    }
}

/// Ensure an UPDATE or DELETE touched a row.
pub(crate) fn expect_affected(rows: u64, what: &str) -> Result<(), CommerceError> {
    if rows == 0 { Err(CommerceError::not_found(what)) } else { Ok(()) }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams { pub page: Option<u32>, pub per_page: Option<u32> }

impl PageParams {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn per_page(&self) -> u32 { self.per_page.unwrap_or(20).clamp(1, 100) }
    pub fn limit(&self) -> i64 { i64::from(self.per_page()) }
    pub fn offset(&self) -> i64 { i64::from(self.page() - 1) * self.limit() }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> { pub items: Vec<T>, pub total: i64, pub page: u32, pub per_page: u32 }

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: i64, params: &PageParams) -> Self {
        Self { items, total, page: params.page(), per_page: params.per_page() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params() {
        let p = PageParams { page: Some(3), per_page: Some(500) };
        assert_eq!(p.per_page(), 100);
        assert_eq!(p.offset(), 200);
        let d = PageParams::default();
        assert_eq!((d.page(), d.per_page(), d.offset()), (1, 20, 0));
        assert_eq!(PageParams { page: Some(0), per_page: Some(0) }.offset(), 0);
    }

    #[test]
    fn test_conflict_as() {
        let e = conflict_as(CommerceError::Conflict("Duplicate entry".into()), "Brand already exists");
        assert_eq!(e.to_string(), "Brand already exists");
        assert!(matches!(conflict_as(CommerceError::validation("x"), "y"), CommerceError::Validation(_)));
    }
}
