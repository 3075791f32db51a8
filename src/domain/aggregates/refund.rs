//! Refund requests

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

status_enum!(RefundStatus, "refund status", {
    Pending => "pending", Approved => "approved", Rejected => "rejected", Processed => "processed",
});

impl RefundStatus {
    /// Rejected and processed refunds are final; approval must precede processing.
    pub fn can_move_to(&self, next: RefundStatus) -> bool {
        use RefundStatus::*;
        matches!((self, next), (Pending, Approved | Rejected) | (Approved, Processed | Rejected)) || *self == next
    }
}

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Refund {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_number: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub customer_id: Uuid,
    pub reason: String,
    #[sqlx(try_from = "String")]
    pub status: RefundStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommerceError;

    #[test]
    fn test_refund_transitions() {
        assert!(RefundStatus::Pending.can_move_to(RefundStatus::Approved));
        assert!(RefundStatus::Approved.can_move_to(RefundStatus::Processed));
        assert!(!RefundStatus::Pending.can_move_to(RefundStatus::Processed));
        assert!(!RefundStatus::Rejected.can_move_to(RefundStatus::Approved));
        assert!(!RefundStatus::Processed.can_move_to(RefundStatus::Pending));
    }

    #[test]
    fn test_refund_status_parse() {
        assert_eq!("APPROVED".parse::<RefundStatus>().unwrap(), RefundStatus::Approved);
        let err: CommerceError = "refundish".parse::<RefundStatus>().unwrap_err().into();
        assert!(matches!(err, CommerceError::Validation(ref m) if m == "Invalid refund status: 'refundish'"));
        assert_eq!(RefundStatus::Processed.to_string(), "processed");
    }
}
