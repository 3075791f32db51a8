//! Read-only admin aggregates.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;
use crate::{CommerceError, Result};

/// Products at or below this stock level are flagged on the dashboard.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DashboardCounts {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub total_customers: i64,
    pub active_products: i64,
    /// Sum of totals over paid orders.
    pub revenue: Decimal,
    pub pending_refunds: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LowStockProduct { pub id: Uuid, pub name: String, pub stock_quantity: i32 }

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentOrder {
    pub id: Uuid,
    pub order_number: String,
    pub customer_name: String,
    pub total: Decimal,
    pub order_status: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub counts: DashboardCounts,
    pub low_stock: Vec<LowStockProduct>,
    pub recent_orders: Vec<RecentOrder>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SalesDay { pub day: NaiveDate, pub orders: i64, pub revenue: Decimal }

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SalesRange { pub from: Option<NaiveDate>, pub to: Option<NaiveDate> }

impl SalesRange {
    /// Inclusive date range, defaulting to the 30 days up to today.
    pub fn resolve(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let to = self.to.unwrap_or(today);
        let from = self.from.unwrap_or(to - chrono::Duration::days(29));
        if from > to {
            return Err(CommerceError::validation("'from' must not be after 'to'"));
        }
        Ok((from, to))
    }
}

pub struct ReportRepository<'a> { db: &'a Database }

impl<'a> ReportRepository<'a> {
    pub const fn new(db: &'a Database) -> Self { Self { db } }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        let counts = self.db.retry("reports.counts", |pool| async move {
            sqlx::query_as::<_, DashboardCounts>(
                r#"SELECT
                     (SELECT COUNT(*) FROM orders) AS total_orders,
                     (SELECT COUNT(*) FROM orders WHERE order_status = 'pending') AS pending_orders,
                     (SELECT COUNT(*) FROM customers) AS total_customers,
                     (SELECT COUNT(*) FROM products WHERE is_active) AS active_products,
                     (SELECT COALESCE(SUM(total), 0) FROM orders WHERE payment_status = 'paid') AS revenue,
                     (SELECT COUNT(*) FROM refunds WHERE status = 'pending') AS pending_refunds"#,
            )
            .fetch_one(&pool).await
        }).await?;
        let low_stock = self.db.retry("reports.low_stock", |pool| async move {
            sqlx::query_as::<_, LowStockProduct>(
                "SELECT id, name, stock_quantity FROM products WHERE is_active AND stock_quantity <= $1 ORDER BY stock_quantity, name LIMIT 20",
            )
            .bind(LOW_STOCK_THRESHOLD).fetch_all(&pool).await
        }).await?;
        let recent_orders = self.db.retry("reports.recent_orders", |pool| async move {
            sqlx::query_as::<_, RecentOrder>(
                r#"SELECT o.id, o.order_number, c.first_name || ' ' || c.last_name AS customer_name,
                          o.total, o.order_status, o.payment_status, o.created_at
                   FROM orders o JOIN customers c ON c.id = o.customer_id
                   ORDER BY o.created_at DESC LIMIT 10"#,
            )
            .fetch_all(&pool).await
        }).await?;
        Ok(Dashboard { counts, low_stock, recent_orders })
    }

    /// Non-cancelled orders per day, both ends inclusive.
    pub async fn sales(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<SalesDay>> {
        self.db.retry("reports.sales", move |pool| async move {
            sqlx::query_as::<_, SalesDay>(
                r#"SELECT (created_at AT TIME ZONE 'UTC')::date AS day, COUNT(*) AS orders, COALESCE(SUM(total), 0) AS revenue
                   FROM orders
                   WHERE order_status <> 'cancelled'
                     AND (created_at AT TIME ZONE 'UTC')::date BETWEEN $1 AND $2
                   GROUP BY day ORDER BY day"#,
            )
            .bind(from).bind(to).fetch_all(&pool).await
        }).await
    }
}
