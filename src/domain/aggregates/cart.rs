//! Cart Aggregate
//!
//! A customer's open cart. Lines are unique per product; adding a product
//! that is already present grows the existing line. Every mutation is checked
//! against live product stock and leaves the cart untouched when it fails.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::product::ProductStock;
use crate::domain::value_objects::{round_cents, Quantity};
use crate::CommerceError;

#[derive(Clone, Debug)]
pub struct Cart {
    id: Uuid,
    lines: Vec<CartLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, sqlx::FromRow)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

impl Cart {
    pub fn new(id: Uuid, lines: Vec<CartLine>) -> Self { Self { id, lines } }

    pub fn id(&self) -> Uuid { self.id }
    pub fn lines(&self) -> &[CartLine] { &self.lines }

    pub fn quantity_of(&self, product_id: Uuid) -> i32 {
        self.lines.iter().find(|l| l.product_id == product_id).map_or(0, |l| l.quantity)
    }

    /// Add `qty` units on top of whatever the cart already holds. Returns the new line quantity.
    pub fn add_item(&mut self, product: &ProductStock, qty: Quantity) -> Result<i32, CommerceError> {
        let existing = self.quantity_of(product.id);
        let total = Quantity::positive(i64::from(existing) + i64::from(qty.value()))?;
        product.ensure_available(total)?;
        match self.lines.iter_mut().find(|l| l.product_id == product.id) {
            Some(line) => line.quantity = total.value(),
            None => self.lines.push(CartLine { product_id: product.id, quantity: total.value() }),
        }
        Ok(total.value())
    }

    /// Replace the line quantity with `qty` (absolute).
    pub fn set_quantity(&mut self, product: &ProductStock, qty: Quantity) -> Result<i32, CommerceError> {
        if self.quantity_of(product.id) == 0 { return Err(CommerceError::not_found("Cart item")); }
        product.ensure_available(qty)?;
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity = qty.value();
        }
        Ok(qty.value())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }
}

/// Free shipping above a subtotal threshold, otherwise a flat fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShippingRule {
    pub free_threshold: Decimal,
    pub flat_fee: Decimal,
}

impl Default for ShippingRule {
    fn default() -> Self { Self { free_threshold: dec!(10000), flat_fee: dec!(500) } }
}

impl ShippingRule {
    pub fn shipping_for(&self, subtotal: Decimal, is_empty: bool) -> Decimal {
        if is_empty || subtotal >= self.free_threshold { Decimal::ZERO } else { self.flat_fee }
    }
}

/// A cart line joined with live product data.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct CartRow {
    pub cart_item_id: Uuid,
    pub quantity: i32,
    #[sqlx(flatten)]
    pub product: ProductStock,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartLineSummary {
    pub cart_item_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub weight: Decimal,
    pub stock_quantity: i32,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartSummary {
    pub items: Vec<CartLineSummary>,
    pub item_count: i64,
    pub subtotal: Decimal,
    pub total_weight: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

impl CartSummary {
    pub fn compute(rows: Vec<CartRow>, rule: &ShippingRule) -> Self {
        let items: Vec<CartLineSummary> = rows
            .into_iter()
            .map(|row| {
                let unit_price = row.product.effective_price();
                CartLineSummary {
                    cart_item_id: row.cart_item_id,
                    product_id: row.product.id,
                    line_total: round_cents(unit_price * Decimal::from(row.quantity)),
                    unit_price,
                    quantity: row.quantity,
                    weight: row.product.weight,
                    stock_quantity: row.product.stock_quantity,
                    price: row.product.price,
                    sale_price: row.product.sale_price,
                    image: row.product.primary_image,
                    name: row.product.name,
                }
            })
            .collect();

        let subtotal = round_cents(items.iter().map(|i| i.line_total).sum());
        let total_weight = items.iter().map(|i| i.weight * Decimal::from(i.quantity)).sum();
        let item_count = items.iter().map(|i| i64::from(i.quantity)).sum();
        let shipping = rule.shipping_for(subtotal, items.is_empty());
        Self { item_count, subtotal, total_weight, shipping, total: round_cents(subtotal + shipping), items }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::sample;

    fn qty(n: i64) -> Quantity { Quantity::positive(n).unwrap() }

    #[test]
    fn test_add_is_additive() {
        let product = sample(10, dec!(100));
        let mut cart = Cart::new(Uuid::now_v7(), vec![]);
        cart.add_item(&product, qty(2)).unwrap();
        assert_eq!(cart.add_item(&product, qty(3)).unwrap(), 5);
        assert_eq!(cart.lines().len(), 1); // merged, never two rows
        assert_eq!(cart.quantity_of(product.id), 5);
    }

    #[test]
    fn test_add_beyond_stock_leaves_cart_unchanged() {
        let product = sample(2, dec!(100));
        let mut cart = Cart::new(Uuid::now_v7(), vec![]);
        cart.add_item(&product, qty(2)).unwrap();
        let err = cart.add_item(&product, qty(1)).unwrap_err();
        assert!(matches!(err, CommerceError::InsufficientStock { .. }));
        assert_eq!(cart.quantity_of(product.id), 2);
    }

    #[test]
    fn test_set_quantity_is_absolute() {
        let product = sample(5, dec!(100));
        let mut cart = Cart::new(Uuid::now_v7(), vec![CartLine { product_id: product.id, quantity: 4 }]);
        assert_eq!(cart.set_quantity(&product, qty(5)).unwrap(), 5);
        assert!(cart.set_quantity(&product, qty(6)).is_err());
        assert_eq!(cart.quantity_of(product.id), 5);
    }

    #[test]
    fn test_set_quantity_requires_existing_line() {
        let product = sample(5, dec!(100));
        let mut cart = Cart::new(Uuid::now_v7(), vec![]);
        assert!(matches!(cart.set_quantity(&product, qty(1)), Err(CommerceError::NotFound(_))));
    }

    #[test]
    fn test_remove_item() {
        let a = sample(5, dec!(1));
        let b = sample(5, dec!(1));
        let mut cart = Cart::new(Uuid::now_v7(), vec![]);
        cart.add_item(&a, qty(1)).unwrap();
        cart.add_item(&b, qty(1)).unwrap();
        assert!(cart.remove_item(a.id));
        assert!(!cart.remove_item(a.id));
        assert_eq!(cart.lines(), &[CartLine { product_id: b.id, quantity: 1 }]);
    }

    #[test]
    fn test_summary_uses_sale_price_and_flat_shipping() {
        let mut discounted = sample(10, dec!(1500));
        discounted.sale_price = Some(dec!(1200));
        discounted.weight = dec!(0.5);
        let plain = sample(10, dec!(300));
        let rows = vec![
            CartRow { cart_item_id: Uuid::now_v7(), quantity: 2, product: discounted },
            CartRow { cart_item_id: Uuid::now_v7(), quantity: 1, product: plain },
        ];
        let summary = CartSummary::compute(rows, &ShippingRule::default());
        assert_eq!(summary.subtotal, dec!(2700));
        assert_eq!(summary.total_weight, dec!(2.0));
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.shipping, dec!(500));
        assert_eq!(summary.total, dec!(3200));
    }

    #[test]
    fn test_summary_free_shipping_over_threshold() {
        let rows = vec![CartRow { cart_item_id: Uuid::now_v7(), quantity: 4, product: sample(10, dec!(2500)) }];
        let summary = CartSummary::compute(rows, &ShippingRule::default());
        assert_eq!(summary.subtotal, dec!(10000));
        assert_eq!(summary.shipping, Decimal::ZERO);
    }

    #[test]
    fn test_empty_summary() {
        let summary = CartSummary::compute(vec![], &ShippingRule::default());
        assert_eq!(summary.total, Decimal::ZERO);
        assert_eq!(summary.item_count, 0);
    }
}
