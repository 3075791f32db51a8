//! Cart manager.
//!
//! Each mutation runs in a short transaction holding the cart row lock, so
//! concurrent requests against one cart apply one after another. The domain
//! [`Cart`](crate::domain::aggregates::Cart) decides; this module loads and
//! persists it.

use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::Database;
use crate::domain::aggregates::{Cart, CartSummary, ProductStock, ShippingRule};
use crate::domain::value_objects::Quantity;
use crate::repository::{carts, catalog};
use crate::{CommerceError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct CartLineInput {
    pub product_id: Uuid,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuantityInput {
    pub quantity: i64,
}

/// A client-held line that could not be merged, and why.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedLine {
    pub product_id: Uuid,
    pub quantity: i64,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct SyncOutcome {
    pub cart: CartSummary,
    pub skipped: Vec<SkippedLine>,
}

pub struct CartManager<'a> {
    db: &'a Database,
    shipping: ShippingRule,
}

impl<'a> CartManager<'a> {
    pub fn new(db: &'a Database, shipping: ShippingRule) -> Self { Self { db, shipping } }

    /// Lines joined with live product state, with totals recomputed on every call.
    pub async fn summary(&self, customer_id: Uuid) -> Result<CartSummary> {
        let rows = carts::summary_rows(self.db, customer_id).await?;
        Ok(CartSummary::compute(rows, &self.shipping))
    }

    /// Add `quantity` units on top of the existing line.
    pub async fn add_item(&self, customer_id: Uuid, line: &CartLineInput) -> Result<CartSummary> {
        let qty = Quantity::positive(line.quantity)?;
        let mut tx = self.db.begin().await?;
        let mut cart = carts::lock(&mut tx, customer_id).await?;
        add_line(&mut tx, &mut cart, line.product_id, qty).await?;
        tx.commit().await?;
        tracing::debug!(%customer_id, product_id = %line.product_id, quantity = qty.value(), "Cart item added");
        self.summary(customer_id).await
    }

    /// Set an absolute quantity; zero removes the line.
    pub async fn update_item(&self, customer_id: Uuid, product_id: Uuid, quantity: i64) -> Result<CartSummary> {
        let mut tx = self.db.begin().await?;
        let mut cart = carts::lock(&mut tx, customer_id).await?;
        if quantity == 0 {
            if !cart.remove_item(product_id) {
                return Err(CommerceError::not_found("Cart item"));
            }
            carts::delete_line(&mut tx, cart.id(), product_id).await?;
        } else {
            let qty = Quantity::positive(quantity)?;
            let product = product_for(&mut tx, product_id).await?;
            let new_quantity = cart.set_quantity(&product, qty)?;
            carts::upsert_line(&mut tx, cart.id(), product_id, new_quantity).await?;
        }
        tx.commit().await?;
        self.summary(customer_id).await
    }

    pub async fn remove_item(&self, customer_id: Uuid, product_id: Uuid) -> Result<CartSummary> {
        let mut tx = self.db.begin().await?;
        let cart = carts::lock(&mut tx, customer_id).await?;
        carts::delete_line(&mut tx, cart.id(), product_id).await?;
        tx.commit().await?;
        self.summary(customer_id).await
    }

    pub async fn clear(&self, customer_id: Uuid) -> Result<CartSummary> {
        let mut tx = self.db.begin().await?;
        carts::lock(&mut tx, customer_id).await?;
        carts::clear_for_customer(&mut tx, customer_id).await?;
        tx.commit().await?;
        self.summary(customer_id).await
    }

    /// Merge a client-held cart additively. Lines that fail validation are
    /// skipped and reported; the rest are kept.
    pub async fn sync(&self, customer_id: Uuid, lines: &[CartLineInput]) -> Result<SyncOutcome> {
        let mut tx = self.db.begin().await?;
        let mut cart = carts::lock(&mut tx, customer_id).await?;
        let mut skipped = Vec::new();
        for line in lines {
            let outcome = match Quantity::positive(line.quantity) {
                Ok(qty) => add_line(&mut tx, &mut cart, line.product_id, qty).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => {}
                Err(e) if e.is_server_error() => return Err(e),
                Err(e) => skipped.push(SkippedLine { product_id: line.product_id, quantity: line.quantity, reason: e.to_string() }),
            }
        }
        tx.commit().await?;
        if !skipped.is_empty() {
            tracing::info!(%customer_id, skipped = skipped.len(), "Cart sync skipped lines");
        }
        Ok(SyncOutcome { cart: self.summary(customer_id).await?, skipped })
    }
}

async fn product_for(conn: &mut PgConnection, product_id: Uuid) -> Result<ProductStock> {
    catalog::read_stock(conn, product_id).await?.ok_or_else(|| CommerceError::not_found("Product"))
}

async fn add_line(conn: &mut PgConnection, cart: &mut Cart, product_id: Uuid, qty: Quantity) -> Result<()> {
    let product = product_for(conn, product_id).await?;
    let new_quantity = cart.add_item(&product, qty)?;
    carts::upsert_line(conn, cart.id(), product_id, new_quantity).await
}
