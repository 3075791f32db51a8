//! Wishlist entries, unique per customer and product.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use super::expect_affected;
use crate::db::Database;
use crate::Result;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WishlistEntry {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub primary_image: Option<String>,
    pub added_at: DateTime<Utc>,
}

pub struct WishlistRepository<'a> { db: &'a Database }

impl<'a> WishlistRepository<'a> {
    pub const fn new(db: &'a Database) -> Self { Self { db } }

    pub async fn list(&self, customer_id: Uuid) -> Result<Vec<WishlistEntry>> {
        self.db.retry("wishlist.list", move |pool| async move {
            sqlx::query_as::<_, WishlistEntry>(
                r#"SELECT p.id AS product_id, p.name, p.price, p.sale_price, p.stock_quantity,
                          (SELECT i.url FROM product_images i WHERE i.product_id = p.id
                            ORDER BY i.is_primary DESC, i.created_at LIMIT 1) AS primary_image,
                          w.created_at AS added_at
                   FROM wishlist_items w
                   JOIN products p ON p.id = w.product_id AND p.is_active
                   WHERE w.customer_id = $1
                   ORDER BY w.created_at DESC"#,
            )
            .bind(customer_id).fetch_all(&pool).await
        }).await
    }

    /// Adding a product twice is a no-op. Returns whether a row was added.
    pub async fn add(&self, customer_id: Uuid, product_id: Uuid) -> Result<bool> {
        let result = sqlx::query("INSERT INTO wishlist_items (customer_id, product_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(customer_id).bind(product_id)
            .execute(self.db.pool()).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove(&self, customer_id: Uuid, product_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE customer_id = $1 AND product_id = $2")
            .bind(customer_id).bind(product_id)
            .execute(self.db.pool()).await?;
        expect_affected(result.rows_affected(), "Wishlist item")
    }
}
