//! Product Aggregate
//!
//! The slice of product state that cart and checkout decisions depend on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::Quantity;
use crate::CommerceError;

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductStock {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub weight: Decimal,
    pub is_active: bool,
    pub primary_image: Option<String>,
}

impl ProductStock {
    /// Sale price when set and lower than the list price.
    pub fn effective_price(&self) -> Decimal {
        match self.sale_price {
            Some(sale) if sale >= Decimal::ZERO && sale < self.price => sale,
            _ => self.price,
        }
    }

    /// Check that `requested` units (absolute, not additive) can be held.
    pub fn ensure_available(&self, requested: Quantity) -> Result<(), CommerceError> {
        if !self.is_active { return Err(CommerceError::Inactive(format!("Product {}", self.name))); }
        if requested.value() > self.stock_quantity {
            return Err(CommerceError::InsufficientStock { product: self.name.clone(), available: self.stock_quantity.max(0) });
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample(stock: i32, price: Decimal) -> ProductStock {
    ProductStock {
        id: Uuid::now_v7(),
        name: "Ceylon Tea".into(),
        price,
        sale_price: None,
        stock_quantity: stock,
        weight: Decimal::ONE,
        is_active: true,
        primary_image: None,
    }
}
