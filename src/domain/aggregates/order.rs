//! Order Aggregate
//!
//! Orders are immutable snapshots of a checkout. Only `order_status` and
//! `payment_status` change afterwards, and only through admin actions.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::product::ProductStock;
use crate::domain::value_objects::{non_negative, round_cents, Quantity};
use crate::CommerceError;

// Pending is the first variant and therefore the default for every status.
status_enum!(OrderStatus, "order status", {
    Pending => "pending", Confirmed => "confirmed", Processing => "processing",
    Shipped => "shipped", Delivered => "delivered", Cancelled => "cancelled",
});

status_enum!(PaymentStatus, "payment status", {
    Pending => "pending", Paid => "paid", Failed => "failed", Refunded => "refunded",
});

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    /// Stored in the `discount` column.
    #[sqlx(rename = "discount")]
    pub payment_fee: Decimal,
    pub total: Decimal,
    pub payment_method: Option<String>,
    #[sqlx(try_from = "String")]
    pub order_status: OrderStatus,
    #[sqlx(try_from = "String")]
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub product_image: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub shipping_address: Option<crate::domain::aggregates::address::ShippingAddress>,
}

// =============================================================================
// Checkout draft
// =============================================================================

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct OrderDraft {
    #[validate(length(min = 1, max = 64))]
    pub order_number: String,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub payment_fee: Decimal,
    pub total: Decimal,
    #[validate(length(min = 1))]
    pub payment_method: String,
    #[validate]
    pub shipping_info: Option<crate::domain::aggregates::address::AddressInput>,
    pub items: Vec<OrderItemDraft>,
}

/// A requested line. Display fields the client sends along (name, image,
/// price) are ignored; the snapshot is taken from the product row.
#[derive(Clone, Debug, Deserialize)]
pub struct OrderItemDraft {
    pub product_id: Uuid,
    pub quantity: i64,
}

impl OrderDraft {
    /// Reject drafts that can never become an order, before any transaction is opened.
    pub fn check(&self) -> Result<(), CommerceError> {
        self.validate()?;
        if self.items.is_empty() {
            return Err(CommerceError::validation("Order must contain at least one item"));
        }
        non_negative("shipping_fee", self.shipping_fee)?;
        non_negative("subtotal", self.subtotal)?;
        non_negative("payment_fee", self.payment_fee)?;
        non_negative("total", self.total)?;
        for item in &self.items {
            Quantity::positive(item.quantity)?;
        }
        Ok(())
    }
}

/// An order line frozen from authoritative product state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LineSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

impl LineSnapshot {
    /// Freeze a line, checking the product can still supply `quantity`.
    pub fn take(product: &ProductStock, quantity: Quantity) -> Result<Self, CommerceError> {
        product.ensure_available(quantity)?;
        let price = product.effective_price();
        Ok(Self {
            product_id: product.id,
            name: product.name.clone(),
            image: product.primary_image.clone(),
            price,
            quantity: quantity.value(),
            subtotal: round_cents(price * Decimal::from(quantity.value())),
        })
    }
}

/// Server-side order totals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub payment_fee: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    pub fn new(lines: &[LineSnapshot], shipping_fee: Decimal, payment_fee: Decimal) -> Self {
        let subtotal = round_cents(lines.iter().map(|l| l.subtotal).sum());
        Self { subtotal, shipping_fee, payment_fee, total: round_cents(subtotal + shipping_fee + payment_fee) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample;
    use rust_decimal_macros::dec;

    fn draft() -> OrderDraft {
        OrderDraft {
            order_number: "ORD-1001".into(),
            subtotal: dec!(2000),
            shipping_fee: dec!(450),
            payment_fee: dec!(58),
            total: dec!(2508),
            payment_method: "payhere".into(),
            shipping_info: None,
            items: vec![OrderItemDraft { product_id: Uuid::now_v7(), quantity: 2 }],
        }
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("Shipped".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert_eq!("paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        let err: CommerceError = "bogus".parse::<OrderStatus>().unwrap_err().into();
        assert!(matches!(err, CommerceError::Validation(ref m) if m.contains("order status")));
        assert!("shipped".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_status_defaults() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(PaymentStatus::default(), PaymentStatus::Pending);
        assert_eq!(serde_json::to_string(&OrderStatus::Cancelled).unwrap(), "\"cancelled\"");
    }

    #[test]
    fn test_draft_check() {
        assert!(draft().check().is_ok());

        let mut empty = draft();
        empty.items.clear();
        assert!(matches!(empty.check(), Err(CommerceError::Validation(ref m)) if m.contains("at least one item")));

        let mut negative = draft();
        negative.shipping_fee = dec!(-1);
        assert!(negative.check().is_err());

        let mut zero_qty = draft();
        zero_qty.items[0].quantity = 0;
        assert!(zero_qty.check().is_err());
    }

    #[test]
    fn test_draft_ignores_client_display_fields() {
        let parsed: OrderDraft = serde_json::from_value(serde_json::json!({
            "order_number": "ORD-1002",
            "subtotal": 1, "shipping_fee": 0, "payment_fee": 0, "total": 1,
            "payment_method": "cod",
            "items": [{"product_id": Uuid::nil(), "quantity": 1, "name": "Tea", "image": null, "price": 1}]
        }))
        .unwrap();
        assert!(parsed.check().is_ok());
        assert_eq!(parsed.items[0].quantity, 1);
    }

    #[test]
    fn test_snapshot_uses_authoritative_price() {
        let mut product = sample(5, dec!(1000));
        product.sale_price = Some(dec!(750));
        let line = LineSnapshot::take(&product, Quantity::positive(2).unwrap()).unwrap();
        assert_eq!(line.price, dec!(750));
        assert_eq!(line.subtotal, dec!(1500));
        assert!(LineSnapshot::take(&product, Quantity::positive(6).unwrap()).is_err());
    }

    #[test]
    fn test_totals() {
        let product = sample(5, dec!(1000));
        let lines = vec![LineSnapshot::take(&product, Quantity::positive(2).unwrap()).unwrap()];
        let totals = OrderTotals::new(&lines, dec!(450), dec!(58));
        assert_eq!(totals.subtotal, dec!(2000));
        assert_eq!(totals.total, dec!(2508));
    }
}
