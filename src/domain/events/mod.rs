//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{OrderStatus, PaymentStatus, RefundStatus};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: Uuid, order_number: String, customer_id: Uuid, total: Decimal },
    OrderStatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    PaymentStatusChanged { order_id: Uuid, from: PaymentStatus, to: PaymentStatus },
    RefundStatusChanged { refund_id: Uuid, from: RefundStatus, to: RefundStatus },
}

impl DomainEvent {
    /// Bus subject the event is published on.
    pub fn subject(&self) -> String {
        let name = match self {
            Self::OrderPlaced { .. } => "order_placed",
            Self::OrderStatusChanged { .. } => "order_status_changed",
            Self::PaymentStatusChanged { .. } => "payment_status_changed",
            Self::RefundStatusChanged { .. } => "refund_status_changed",
        };
        format!("commerce.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = DomainEvent::PaymentStatusChanged { order_id: Uuid::nil(), from: PaymentStatus::Pending, to: PaymentStatus::Paid };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "payment_status_changed");
        assert_eq!(json["to"], "paid");
        assert_eq!(event.subject(), "commerce.payment_status_changed");
    }
}
