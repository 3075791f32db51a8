//! Storefront Commerce
//!
//! Storefront and admin backend over PostgreSQL.
//!
//! ## Features
//! - Product catalog with brands, categories and images
//! - Per-customer cart validated against live stock
//! - Transactional checkout producing immutable order snapshots
//! - Delivery-zone and payment-method fee calculation
//! - PayHere and Koko payment signatures
//! - Reviews, wishlist, refunds, promo codes and admin reports

pub mod config;
pub mod db;
pub mod domain;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Every failure the data-access and service layers can report.
///
/// The variant is the error kind; the HTTP layer maps it to a status code once.
#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} is not active")]
    Inactive(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Insufficient stock for {product}. Only {available} available")]
    InsufficientStock { product: String, available: i32 },

    #[error("Invalid payment method: {0}")]
    InvalidPaymentMethod(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Transient database error: {0}")]
    Transient(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Upstream service error: {0}")]
    Upstream(String),
}

impl CommerceError {
    pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
    pub fn not_found(what: impl Into<String>) -> Self { Self::NotFound(what.into()) }

    /// True for failures caused by the server or its collaborators rather than the request.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Database(_) | Self::Upstream(_))
    }
}

impl From<sqlx::Error> for CommerceError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict("Duplicate entry".to_string());
            }
        }
        if db::is_transient(&e) {
            return Self::Transient(e);
        }
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("Record".to_string()),
            other => Self::Database(other),
        }
    }
}

impl From<validator::ValidationErrors> for CommerceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        Self::Validation(format!("Invalid value for: {}", fields.join(", ")))
    }
}

pub type Result<T> = std::result::Result<T, CommerceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CommerceError::InsufficientStock { product: "Tea".into(), available: 2 };
        assert_eq!(err.to_string(), "Insufficient stock for Tea. Only 2 available");
        assert_eq!(CommerceError::not_found("Product").to_string(), "Product not found");
        assert_eq!(CommerceError::Inactive("Payment method".into()).to_string(), "Payment method is not active");
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(CommerceError::from(sqlx::Error::RowNotFound), CommerceError::NotFound(_)));
    }

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = CommerceError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, CommerceError::Transient(_)));
        assert!(err.is_server_error());
    }
}
