//! Payment gateway signatures and callback handling.
//!
//! Neither gateway is called from here; the storefront hands signed field
//! sets to the browser and verifies the gateways' server-to-server callbacks.

pub mod koko;
pub mod payhere;

use crate::db::Database;
use crate::domain::aggregates::PaymentStatus;
use crate::domain::events::DomainEvent;
use crate::repository::orders::OrderRepository;
use crate::services::events::EventPublisher;
use crate::Result;

/// Constant-time string comparison for signatures.
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Apply a verified gateway outcome to the order's payment status.
/// `None` means the gateway reported nothing final and the order is left alone.
pub async fn record_gateway_status(db: &Database, events: &EventPublisher, gateway: &str, order_number: &str, status: Option<PaymentStatus>) -> Result<()> {
    let Some(status) = status else {
        tracing::info!(gateway, order_number, "Gateway reported a non-final status");
        return Ok(());
    };
    let change = OrderRepository::new(db).set_payment_status_by_number(order_number, status).await?;
    tracing::info!(gateway, order_number, from = %change.from, to = %change.to, "Payment status updated by gateway");
    if change.from != change.to {
        events.publish(DomainEvent::PaymentStatusChanged { order_id: change.order_id, from: change.from, to: change.to }).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("ABC123", "ABC123"));
        assert!(!constant_time_eq("ABC123", "ABC124"));
        assert!(!constant_time_eq("ABC", "ABC1"));
        assert!(constant_time_eq("", ""));
    }
}
