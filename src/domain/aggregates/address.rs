//! Shipping addresses
//!
//! Addresses are append-only. Rows without an order are the customer's
//! default-address history (newest wins); rows with an order are snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(length(min = 7, max = 20))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address_line1: String,
    pub address_line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    pub district: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct ShippingAddress {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_id: Option<Uuid>,
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub district: Option<String>,
    pub postal_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_validation() {
        let mut input = AddressInput {
            full_name: "Nimal Perera".into(),
            phone: "0771234567".into(),
            email: Some("nimal@example.com".into()),
            address_line1: "12 Temple Road".into(),
            address_line2: None,
            city: "Kandy".into(),
            district: Some("Kandy".into()),
            postal_code: Some("20000".into()),
        };
        assert!(input.validate().is_ok());
        input.email = Some("not-an-email".into());
        assert!(input.validate().is_err());
    }
}
