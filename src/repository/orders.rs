//! Orders, order items and their shipping snapshots.

use serde::Serialize;
use sqlx::PgConnection;
use uuid::Uuid;

use super::{PageParams, Paginated};
use crate::db::Database;
use crate::domain::aggregates::{LineSnapshot, Order, OrderItem, OrderStatus, OrderTotals, OrderWithItems, PaymentStatus, ShippingAddress};
use crate::{CommerceError, Result};

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.order_number, o.customer_id, o.subtotal, o.shipping_fee, o.discount, o.total,
           pm.slug AS payment_method, o.order_status, o.payment_status, o.created_at, o.updated_at
    FROM orders o
    LEFT JOIN payment_methods pm ON pm.id = o.payment_method_id
"#;

/// An order as listed for admins, with the customer it belongs to.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminOrder {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub order: Order,
    pub customer_name: String,
    pub customer_email: String,
}

/// A status change that was applied, with the value it replaced.
#[derive(Debug, Clone, Copy)]
pub struct StatusChange<S> { pub order_id: Uuid, pub from: S, pub to: S }

pub struct OrderRepository<'a> { db: &'a Database }

impl<'a> OrderRepository<'a> {
    pub const fn new(db: &'a Database) -> Self { Self { db } }

    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<OrderWithItems>> {
        let sql = format!("{ORDER_SELECT} WHERE o.customer_id = $1 ORDER BY o.created_at DESC");
        let sql = sql.as_str();
        let orders = self.db.retry("orders.for_customer", move |pool| async move {
            sqlx::query_as::<_, Order>(sql).bind(customer_id).fetch_all(&pool).await
        }).await?;
        self.with_items(orders).await
    }

    /// A customer's own order; someone else's order reads as absent.
    pub async fn get_for_customer(&self, id: Uuid, customer_id: Uuid) -> Result<OrderWithItems> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = $1 AND o.customer_id = $2");
        let sql = sql.as_str();
        let order = self.db.retry("orders.get_own", move |pool| async move {
            sqlx::query_as::<_, Order>(sql).bind(id).bind(customer_id).fetch_optional(&pool).await
        }).await?.ok_or_else(|| CommerceError::not_found("Order"))?;
        self.with_items(vec![order]).await?.pop().ok_or_else(|| CommerceError::not_found("Order"))
    }

    pub async fn list_all(&self, status: Option<OrderStatus>, page: &PageParams) -> Result<Paginated<AdminOrder>> {
        let status = status.map(|s| s.as_str());
        let list_sql = format!(
            "SELECT q.*, c.first_name || ' ' || c.last_name AS customer_name, c.email AS customer_email \
             FROM ({ORDER_SELECT}) q JOIN customers c ON c.id = q.customer_id \
             WHERE ($1::text IS NULL OR q.order_status = $1) ORDER BY q.created_at DESC LIMIT $2 OFFSET $3"
        );
        let list_sql = list_sql.as_str();
        let items = self.db.retry("orders.list_all", move |pool| async move {
            sqlx::query_as::<_, AdminOrder>(list_sql).bind(status).bind(page.limit()).bind(page.offset()).fetch_all(&pool).await
        }).await?;
        let total = self.db.retry("orders.count", move |pool| async move {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE ($1::text IS NULL OR order_status = $1)")
                .bind(status).fetch_one(&pool).await
        }).await?;
        Ok(Paginated::new(items, total, page))
    }

    pub async fn get(&self, id: Uuid) -> Result<OrderWithItems> {
        let sql = format!("{ORDER_SELECT} WHERE o.id = $1");
        let sql = sql.as_str();
        let order = self.db.retry("orders.get", move |pool| async move {
            sqlx::query_as::<_, Order>(sql).bind(id).fetch_optional(&pool).await
        }).await?.ok_or_else(|| CommerceError::not_found("Order"))?;
        self.with_items(vec![order]).await?.pop().ok_or_else(|| CommerceError::not_found("Order"))
    }

    pub async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        let sql = format!("{ORDER_SELECT} WHERE o.order_number = $1");
        let sql = sql.as_str();
        self.db.retry("orders.by_number", move |pool| async move {
            sqlx::query_as::<_, Order>(sql).bind(order_number).fetch_optional(&pool).await
        }).await
    }

    async fn with_items(&self, orders: Vec<Order>) -> Result<Vec<OrderWithItems>> {
        if orders.is_empty() { return Ok(Vec::new()); }
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let ids = ids.as_slice();
        let items = self.db.retry("orders.items", move |pool| async move {
            sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, line_no")
                .bind(ids).fetch_all(&pool).await
        }).await?;
        let addresses = self.db.retry("orders.addresses", move |pool| async move {
            sqlx::query_as::<_, ShippingAddress>("SELECT * FROM shipping_addresses WHERE order_id = ANY($1)")
                .bind(ids).fetch_all(&pool).await
        }).await?;

        Ok(orders
            .into_iter()
            .map(|order| OrderWithItems {
                items: items.iter().filter(|i| i.order_id == order.id).cloned().collect(),
                shipping_address: addresses.iter().find(|a| a.order_id == Some(order.id)).cloned(),
                order,
            })
            .collect())
    }

    /// Apply a parsed status and return the one it replaced.
    pub async fn set_order_status(&self, id: Uuid, status: OrderStatus) -> Result<StatusChange<OrderStatus>> {
        let previous: Option<String> = sqlx::query_scalar(
            "UPDATE orders o SET order_status = $2, updated_at = NOW() \
             FROM (SELECT id, order_status AS previous FROM orders WHERE id = $1 FOR UPDATE) prev \
             WHERE o.id = prev.id RETURNING prev.previous",
        )
        .bind(id).bind(status.as_str())
        .fetch_optional(self.db.pool()).await?;
        let from = previous.ok_or_else(|| CommerceError::not_found("Order"))?.parse::<OrderStatus>()?;
        Ok(StatusChange { order_id: id, from, to: status })
    }

    pub async fn set_payment_status(&self, id: Uuid, status: PaymentStatus) -> Result<StatusChange<PaymentStatus>> {
        let previous: Option<String> = sqlx::query_scalar(
            "UPDATE orders o SET payment_status = $2, updated_at = NOW() \
             FROM (SELECT id, payment_status AS previous FROM orders WHERE id = $1 FOR UPDATE) prev \
             WHERE o.id = prev.id RETURNING prev.previous",
        )
        .bind(id).bind(status.as_str())
        .fetch_optional(self.db.pool()).await?;
        let from = previous.ok_or_else(|| CommerceError::not_found("Order"))?.parse::<PaymentStatus>()?;
        Ok(StatusChange { order_id: id, from, to: status })
    }

    /// Gateway callbacks identify orders by their number.
    pub async fn set_payment_status_by_number(&self, order_number: &str, status: PaymentStatus) -> Result<StatusChange<PaymentStatus>> {
        let row: Option<(Uuid, String)> = sqlx::query_as(
            "UPDATE orders o SET payment_status = $2, updated_at = NOW() \
             FROM (SELECT id, payment_status AS previous FROM orders WHERE order_number = $1 FOR UPDATE) prev \
             WHERE o.id = prev.id RETURNING o.id, prev.previous",
        )
        .bind(order_number).bind(status.as_str())
        .fetch_optional(self.db.pool()).await?;
        let (order_id, previous) = row.ok_or_else(|| CommerceError::not_found("Order"))?;
        Ok(StatusChange { order_id, from: previous.parse::<PaymentStatus>()?, to: status })
    }

    /// True when the customer has a non-cancelled order containing the product.
    pub async fn has_purchased(&self, customer_id: Uuid, product_id: Uuid) -> Result<bool> {
        self.db.retry("orders.has_purchased", move |pool| async move {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM orders o JOIN order_items i ON i.order_id = o.id \
                 WHERE o.customer_id = $1 AND i.product_id = $2 AND o.order_status <> 'cancelled')",
            )
            .bind(customer_id).bind(product_id).fetch_one(&pool).await
        }).await
    }

    /// True when the order belongs to the customer and has a line for the product.
    pub async fn contains_product(&self, order_id: Uuid, customer_id: Uuid, product_id: Uuid) -> Result<bool> {
        self.db.retry("orders.contains_product", move |pool| async move {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM orders o JOIN order_items i ON i.order_id = o.id \
                 WHERE o.id = $1 AND o.customer_id = $2 AND i.product_id = $3)",
            )
            .bind(order_id).bind(customer_id).bind(product_id).fetch_one(&pool).await
        }).await
    }
}

/// Insert the order header inside the checkout transaction. The payment fee goes in `discount`.
pub async fn insert_header(
    conn: &mut PgConnection,
    order_number: &str,
    customer_id: Uuid,
    totals: &OrderTotals,
    payment_method_id: Uuid,
) -> Result<Uuid> {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO orders (id, order_number, customer_id, subtotal, shipping_fee, discount, total, payment_method_id, order_status, payment_status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(id).bind(order_number).bind(customer_id)
    .bind(totals.subtotal).bind(totals.shipping_fee).bind(totals.payment_fee).bind(totals.total)
    .bind(payment_method_id)
    .bind(OrderStatus::default().as_str()).bind(PaymentStatus::default().as_str())
    .execute(conn).await
    .map_err(|e| super::conflict_as(e, "Order number already exists"))?;
    Ok(id)
}

pub async fn insert_item(conn: &mut PgConnection, order_id: Uuid, line_no: i32, line: &LineSnapshot) -> Result<()> {
    sqlx::query(
        "INSERT INTO order_items (id, order_id, line_no, product_id, product_name, product_image, price, quantity, subtotal) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(Uuid::now_v7()).bind(order_id).bind(line_no).bind(line.product_id).bind(&line.name).bind(&line.image)
    .bind(line.price).bind(line.quantity).bind(line.subtotal)
    .execute(conn).await?;
    Ok(())
}
