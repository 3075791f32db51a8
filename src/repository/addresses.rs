//! Shipping address history and order snapshots.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::Database;
use crate::domain::aggregates::{AddressInput, ShippingAddress};
use crate::Result;

const INSERT: &str = "INSERT INTO shipping_addresses \
    (id, customer_id, order_id, full_name, phone, email, address_line1, address_line2, city, district, postal_code) \
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING *";

pub struct AddressRepository<'a> { db: &'a Database }

impl<'a> AddressRepository<'a> {
    pub const fn new(db: &'a Database) -> Self { Self { db } }

    /// The most recently saved default address.
    pub async fn current_default(&self, customer_id: Uuid) -> Result<Option<ShippingAddress>> {
        self.db.retry("addresses.default", move |pool| async move {
            sqlx::query_as::<_, ShippingAddress>(
                "SELECT * FROM shipping_addresses WHERE customer_id = $1 AND order_id IS NULL ORDER BY created_at DESC, id DESC LIMIT 1",
            )
            .bind(customer_id).fetch_optional(&pool).await
        }).await
    }

    pub async fn history(&self, customer_id: Uuid) -> Result<Vec<ShippingAddress>> {
        self.db.retry("addresses.history", move |pool| async move {
            sqlx::query_as::<_, ShippingAddress>(
                "SELECT * FROM shipping_addresses WHERE customer_id = $1 ORDER BY created_at DESC, id DESC",
            )
            .bind(customer_id).fetch_all(&pool).await
        }).await
    }

    /// Saving a default appends to the history; earlier rows are kept.
    pub async fn save_default(&self, customer_id: Uuid, input: &AddressInput) -> Result<ShippingAddress> {
        let mut conn = self.db.pool().acquire().await?;
        insert(&mut *conn, customer_id, None, input).await
    }
}

/// Insert an address row; `order_id` set makes it an order snapshot.
pub async fn insert(conn: &mut PgConnection, customer_id: Uuid, order_id: Option<Uuid>, a: &AddressInput) -> Result<ShippingAddress> {
    Ok(sqlx::query_as::<_, ShippingAddress>(INSERT)
        .bind(Uuid::now_v7()).bind(customer_id).bind(order_id)
        .bind(a.full_name.trim()).bind(a.phone.trim()).bind(&a.email)
        .bind(a.address_line1.trim()).bind(&a.address_line2).bind(a.city.trim())
        .bind(&a.district).bind(&a.postal_code)
        .fetch_one(conn).await?)
}
