//! Order assembler: turns a checkout draft into an immutable order.
//!
//! Everything from resolving the payment method to clearing the cart happens
//! in one transaction. Product rows are locked while their stock is checked
//! and decremented, so prices and quantities written to the order are the
//! ones that were current at commit. If any step fails the transaction is
//! dropped, which rolls back every statement before it.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::Database;
use crate::domain::aggregates::{LineSnapshot, OrderDraft, OrderItemDraft, OrderTotals};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::Quantity;
use crate::repository::customers::CustomerRepository;
use crate::repository::{addresses, carts, catalog, orders, pricing};
use crate::services::email::{self, Mailer};
use crate::services::events::EventPublisher;
use crate::{CommerceError, Result};

#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_id: Uuid,
    pub order_number: String,
    pub subtotal: Decimal,
    pub payment_fee: Decimal,
    pub total: Decimal,
}

struct Assembled {
    order_id: Uuid,
    lines: Vec<LineSnapshot>,
    totals: OrderTotals,
}

pub struct OrderAssembler<'a> {
    db: &'a Database,
    mailer: &'a dyn Mailer,
    events: &'a EventPublisher,
}

impl<'a> OrderAssembler<'a> {
    pub fn new(db: &'a Database, mailer: &'a dyn Mailer, events: &'a EventPublisher) -> Self { Self { db, mailer, events } }

    /// Place an order for `customer_id`. Never retried: a failure leaves no trace in the database.
    pub async fn place(&self, customer_id: Uuid, draft: &OrderDraft) -> Result<PlacedOrder> {
        draft.check()?;

        let mut tx = self.db.begin().await?;
        let assembled = match assemble(&mut tx, customer_id, draft).await {
            Ok(assembled) => assembled,
            Err(e) => {
                tracing::warn!(%customer_id, order_number = %draft.order_number, error = %e, "Checkout rolled back");
                return Err(e);
            }
        };
        tx.commit().await?;

        let Assembled { order_id, lines, totals } = assembled;
        tracing::info!(%order_id, order_number = %draft.order_number, total = %totals.total, "Order placed");
        if totals.subtotal != draft.subtotal || totals.total != draft.total {
            tracing::info!(
                %order_id,
                client_subtotal = %draft.subtotal,
                client_total = %draft.total,
                subtotal = %totals.subtotal,
                total = %totals.total,
                "Client totals differed from recomputed totals"
            );
        }

        self.confirm(customer_id, &draft.order_number, &lines, &totals).await;
        self.events
            .publish(DomainEvent::OrderPlaced { order_id, order_number: draft.order_number.clone(), customer_id, total: totals.total })
            .await;

        Ok(PlacedOrder {
            order_id,
            order_number: draft.order_number.clone(),
            subtotal: totals.subtotal,
            payment_fee: totals.payment_fee,
            total: totals.total,
        })
    }

    /// Confirmation email, best-effort.
    async fn confirm(&self, customer_id: Uuid, order_number: &str, lines: &[LineSnapshot], totals: &OrderTotals) {
        let customer = match CustomerRepository::new(self.db).get(customer_id).await {
            Ok(customer) => customer,
            Err(e) => {
                tracing::warn!(%customer_id, error = %e, "Could not load customer for order confirmation");
                return;
            }
        };
        let html = email::order_confirmation_html(&customer.first_name, order_number, lines, totals);
        if let Err(e) = self.mailer.send(&customer.email, &format!("Order confirmation {order_number}"), &html).await {
            tracing::warn!(%customer_id, order_number, error = %e, "Order confirmation email failed");
        }
    }
}

async fn assemble(conn: &mut PgConnection, customer_id: Uuid, draft: &OrderDraft) -> Result<Assembled> {
    let method = pricing::method_by_slug_tx(conn, &draft.payment_method)
        .await?
        .ok_or_else(|| CommerceError::InvalidPaymentMethod(draft.payment_method.clone()))?;

    let mut taken: Vec<Option<LineSnapshot>> = vec![None; draft.items.len()];
    for index in lock_order(&draft.items) {
        let item = &draft.items[index];
        let quantity = Quantity::positive(item.quantity)?;
        let product = catalog::lock_stock(conn, item.product_id)
            .await?
            .ok_or_else(|| CommerceError::not_found("Product"))?;
        let line = LineSnapshot::take(&product, quantity)?;
        catalog::decrement_stock(conn, product.id, quantity.value()).await?;
        taken[index] = Some(line);
    }
    // Every index was visited, so the lines come back in the order requested.
    let lines: Vec<LineSnapshot> = taken.into_iter().flatten().collect();

    let subtotal = OrderTotals::new(&lines, Decimal::ZERO, Decimal::ZERO).subtotal;
    let totals = OrderTotals::new(&lines, draft.shipping_fee, method.fee_for(subtotal)?);

    let order_id = orders::insert_header(conn, &draft.order_number, customer_id, &totals, method.id).await?;
    for (line_no, line) in (1..).zip(&lines) {
        orders::insert_item(conn, order_id, line_no, line).await?;
    }
    if let Some(address) = &draft.shipping_info {
        addresses::insert(conn, customer_id, Some(order_id), address).await?;
    }
    carts::clear_for_customer(conn, customer_id).await?;

    Ok(Assembled { order_id, lines, totals })
}

/// Positions of `items` sorted by product id. Rows are locked in this order
/// so concurrent checkouts cannot deadlock.
fn lock_order(items: &[OrderItemDraft]) -> Vec<usize> {
    let mut positions: Vec<usize> = (0..items.len()).collect();
    positions.sort_by_key(|&i| items[i].product_id);
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_order_sorts_by_product_without_moving_lines() {
        let (low, high) = (Uuid::from_u128(1), Uuid::from_u128(2));
        let items = vec![
            OrderItemDraft { product_id: high, quantity: 1 },
            OrderItemDraft { product_id: low, quantity: 3 },
            OrderItemDraft { product_id: high, quantity: 2 },
        ];
        assert_eq!(lock_order(&items), vec![1, 0, 2]);
        assert_eq!(items[0].product_id, high);
    }
}
