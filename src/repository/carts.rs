//! Cart rows. Writes take the caller's transaction connection so the cart
//! manager can hold the cart lock across a read-validate-write sequence.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::db::Database;
use crate::domain::aggregates::{Cart, CartLine, CartRow};
use crate::Result;

const SUMMARY_SELECT: &str = r#"
    SELECT ci.id AS cart_item_id, ci.quantity,
           p.id, p.name, p.price, p.sale_price, p.stock_quantity, p.weight, p.is_active,
           (SELECT i.url FROM product_images i WHERE i.product_id = p.id
             ORDER BY i.is_primary DESC, i.created_at LIMIT 1) AS primary_image
    FROM carts c
    JOIN cart_items ci ON ci.cart_id = c.id
    JOIN products p ON p.id = ci.product_id AND p.is_active
    WHERE c.customer_id = $1
    ORDER BY ci.created_at
"#;

/// Return the customer's cart id, creating the cart on first use.
///
/// The unique `customer_id` plus `ON CONFLICT DO NOTHING` keeps concurrent
/// first writes from producing a second cart.
pub async fn find_or_create(conn: &mut PgConnection, customer_id: Uuid) -> Result<Uuid> {
    sqlx::query("INSERT INTO carts (id, customer_id) VALUES ($1, $2) ON CONFLICT (customer_id) DO NOTHING")
        .bind(Uuid::now_v7()).bind(customer_id)
        .execute(&mut *conn).await?;
    Ok(sqlx::query_scalar::<_, Uuid>("SELECT id FROM carts WHERE customer_id = $1")
        .bind(customer_id)
        .fetch_one(&mut *conn).await?)
}

/// Lock the cart row and load its lines. Held until the transaction ends.
pub async fn lock(conn: &mut PgConnection, customer_id: Uuid) -> Result<Cart> {
    let cart_id = find_or_create(conn, customer_id).await?;
    sqlx::query("SELECT id FROM carts WHERE id = $1 FOR UPDATE").bind(cart_id).execute(&mut *conn).await?;
    let lines = sqlx::query_as::<_, CartLine>("SELECT product_id, quantity FROM cart_items WHERE cart_id = $1 ORDER BY created_at")
        .bind(cart_id)
        .fetch_all(&mut *conn).await?;
    Ok(Cart::new(cart_id, lines))
}

pub async fn upsert_line(conn: &mut PgConnection, cart_id: Uuid, product_id: Uuid, quantity: i32) -> Result<()> {
    sqlx::query(
        "INSERT INTO cart_items (id, cart_id, product_id, quantity) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()",
    )
    .bind(Uuid::now_v7()).bind(cart_id).bind(product_id).bind(quantity)
    .execute(&mut *conn).await?;
    touch(conn, cart_id).await
}

pub async fn delete_line(conn: &mut PgConnection, cart_id: Uuid, product_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2")
        .bind(cart_id).bind(product_id)
        .execute(&mut *conn).await?;
    touch(conn, cart_id).await?;
    Ok(result.rows_affected())
}

/// Remove every line of the customer's cart; a customer without a cart is a no-op.
pub async fn clear_for_customer(conn: &mut PgConnection, customer_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id IN (SELECT id FROM carts WHERE customer_id = $1)")
        .bind(customer_id)
        .execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

async fn touch(conn: &mut PgConnection, cart_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1").bind(cart_id).execute(conn).await?;
    Ok(())
}

/// Cart lines joined with live product state. Lines whose product was deactivated are left out.
pub async fn summary_rows(db: &Database, customer_id: Uuid) -> Result<Vec<CartRow>> {
    db.retry("carts.summary", move |pool| async move {
        sqlx::query_as::<_, CartRow>(SUMMARY_SELECT).bind(customer_id).fetch_all(&pool).await
    }).await
}
