//! Refund requests against order lines.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::db::Database;
use crate::domain::aggregates::{Refund, RefundStatus};
use crate::{CommerceError, Result};

const REFUND_SELECT: &str = r#"
    SELECT r.id, r.order_id, o.order_number, r.product_id, p.name AS product_name, r.customer_id,
           r.reason, r.status, r.admin_notes, r.created_at, r.updated_at
    FROM refunds r
    JOIN orders o ON o.id = r.order_id
    JOIN products p ON p.id = r.product_id
"#;

#[derive(Debug, Deserialize, Validate)]
pub struct RefundRequest {
    pub order_id: Uuid,
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefundDecision {
    pub status: String,
    pub admin_notes: Option<String>,
}

pub struct RefundRepository<'a> { db: &'a Database }

impl<'a> RefundRepository<'a> {
    pub const fn new(db: &'a Database) -> Self { Self { db } }

    /// Open a refund. Only one refund may be open per order line.
    pub async fn create(&self, customer_id: Uuid, r: &RefundRequest) -> Result<Refund> {
        let mut tx = self.db.begin().await?;
        sqlx::query("SELECT id FROM orders WHERE id = $1 FOR UPDATE").bind(r.order_id).execute(&mut *tx).await?;
        let open: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM refunds WHERE order_id = $1 AND product_id = $2 AND status IN ('pending', 'approved'))",
        )
        .bind(r.order_id).bind(r.product_id)
        .fetch_one(&mut *tx).await?;
        if open {
            return Err(CommerceError::Conflict("A refund for this item is already in progress".into()));
        }
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO refunds (id, order_id, product_id, customer_id, reason) VALUES ($1, $2, $3, $4, $5)")
            .bind(id).bind(r.order_id).bind(r.product_id).bind(customer_id).bind(r.reason.trim())
            .execute(&mut *tx).await?;
        tx.commit().await?;
        self.get(id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Refund> {
        let sql = format!("{REFUND_SELECT} WHERE r.id = $1");
        let sql = sql.as_str();
        self.db.retry("refunds.get", move |pool| async move {
            sqlx::query_as::<_, Refund>(sql).bind(id).fetch_optional(&pool).await
        }).await?.ok_or_else(|| CommerceError::not_found("Refund"))
    }

    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Refund>> {
        let sql = format!("{REFUND_SELECT} WHERE r.customer_id = $1 ORDER BY r.created_at DESC");
        let sql = sql.as_str();
        self.db.retry("refunds.for_customer", move |pool| async move {
            sqlx::query_as::<_, Refund>(sql).bind(customer_id).fetch_all(&pool).await
        }).await
    }

    pub async fn list_all(&self, status: Option<RefundStatus>) -> Result<Vec<Refund>> {
        let sql = format!("{REFUND_SELECT} WHERE ($1::text IS NULL OR r.status = $1) ORDER BY r.created_at DESC");
        let (sql, status) = (sql.as_str(), status.map(|s| s.as_str()));
        self.db.retry("refunds.list", move |pool| async move {
            sqlx::query_as::<_, Refund>(sql).bind(status).fetch_all(&pool).await
        }).await
    }

    /// Move a refund to `next`, refusing transitions out of a final state.
    /// Returns the status it replaced.
    pub async fn decide(&self, id: Uuid, next: RefundStatus, admin_notes: Option<&str>) -> Result<(RefundStatus, Refund)> {
        let mut tx = self.db.begin().await?;
        let current: String = sqlx::query_scalar("SELECT status FROM refunds WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx).await?
            .ok_or_else(|| CommerceError::not_found("Refund"))?;
        let current: RefundStatus = current.parse()?;
        if !current.can_move_to(next) {
            return Err(CommerceError::validation(format!("Cannot move refund from {} to {}", current.as_str(), next.as_str())));
        }
        sqlx::query("UPDATE refunds SET status = $2, admin_notes = COALESCE($3, admin_notes), updated_at = NOW() WHERE id = $1")
            .bind(id).bind(next.as_str()).bind(admin_notes)
            .execute(&mut *tx).await?;
        tx.commit().await?;
        Ok((current, self.get(id).await?))
    }
}
