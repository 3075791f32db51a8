//! Database-backed checkout, cart and catalog tests.
//!
//! Run with a PostgreSQL `DATABASE_URL` and `cargo test -- --ignored`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;
use storefront_commerce::config::ShippingRule;
use storefront_commerce::db::{Database, RetryPolicy};
use storefront_commerce::domain::aggregates::{OrderDraft, OrderStatus};
use storefront_commerce::repository::catalog::ProductRepository;
use storefront_commerce::repository::orders::OrderRepository;
use storefront_commerce::services::cart::{CartLineInput, CartManager};
use storefront_commerce::services::checkout::OrderAssembler;
use storefront_commerce::services::email::LogMailer;
use storefront_commerce::services::events::EventPublisher;
use storefront_commerce::CommerceError;
use uuid::Uuid;

fn database(pool: PgPool) -> Database { Database::new(pool, RetryPolicy::default()) }

async fn customer(pool: &PgPool) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO customers (id, first_name, last_name, email, password_hash) VALUES ($1, 'Kamal', 'Perera', $2, 'x')")
        .bind(id)
        .bind(format!("{id}@example.com"))
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn product(pool: &PgPool, name: &str, price: Decimal, stock: i32) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO products (id, name, price, stock_quantity, weight) VALUES ($1, $2, $3, $4, 0.5)")
        .bind(id)
        .bind(name)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn stock_of(pool: &PgPool, id: Uuid) -> i32 {
    sqlx::query_scalar("SELECT stock_quantity FROM products WHERE id = $1").bind(id).fetch_one(pool).await.unwrap()
}

async fn count(pool: &PgPool, sql: &str, customer_id: Uuid) -> i64 {
    sqlx::query_scalar(sql).bind(customer_id).fetch_one(pool).await.unwrap()
}

fn draft(order_number: &str, items: &[(Uuid, i64)]) -> OrderDraft {
    serde_json::from_value(serde_json::json!({
        "order_number": order_number,
        "subtotal": 0,
        "shipping_fee": 500,
        "payment_fee": 0,
        "total": 0,
        "payment_method": "payhere",
        "shipping_info": {
            "full_name": "Kamal Perera",
            "phone": "0771234567",
            "address_line1": "12 Galle Road",
            "city": "Colombo"
        },
        "items": items.iter().map(|(id, qty)| serde_json::json!({"product_id": id, "quantity": qty})).collect::<Vec<_>>()
    }))
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_order_snapshots_server_prices_and_fee(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let tea = product(&pool, "Ceylon Tea", dec!(1000.00), 10).await;
    let db = database(pool.clone());
    let (mailer, events) = (LogMailer, EventPublisher::default());

    CartManager::new(&db, ShippingRule::default())
        .add_item(customer_id, &CartLineInput { product_id: tea, quantity: 1 })
        .await
        .unwrap();

    let placed = OrderAssembler::new(&db, &mailer, &events).place(customer_id, &draft("ORD-1001", &[(tea, 2)])).await.unwrap();
    assert_eq!(placed.subtotal, dec!(2000.00));
    assert_eq!(placed.payment_fee, dec!(58.00));
    assert_eq!(placed.total, dec!(2558.00));
    assert_eq!(stock_of(&pool, tea).await, 8);

    let order = OrderRepository::new(&db).get_for_customer(placed.order_id, customer_id).await.unwrap();
    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].price, dec!(1000.00));
    assert!(order.shipping_address.is_some());
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM cart_items i JOIN carts c ON c.id = i.cart_id WHERE c.customer_id = $1", customer_id).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_failing_item_rolls_back_whole_order(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let mut ids = vec![
        product(&pool, "Tea", dec!(500), 5).await,
        product(&pool, "Cinnamon", dec!(300), 5).await,
        product(&pool, "Pepper", dec!(200), 5).await,
    ];
    // Lines are processed in id order; the middle one runs out.
    ids.sort();
    let (first, second, third) = (ids[0], ids[1], ids[2]);
    sqlx::query("UPDATE products SET stock_quantity = 0 WHERE id = $1").bind(second).execute(&pool).await.unwrap();
    let db = database(pool.clone());
    let (mailer, events) = (LogMailer, EventPublisher::default());

    let result = OrderAssembler::new(&db, &mailer, &events)
        .place(customer_id, &draft("ORD-2001", &[(first, 1), (second, 1), (third, 1)]))
        .await;
    assert!(matches!(result, Err(CommerceError::InsufficientStock { .. })));

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM orders WHERE customer_id = $1", customer_id).await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM order_items i JOIN orders o ON o.id = i.order_id WHERE o.customer_id = $1", customer_id).await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM shipping_addresses WHERE customer_id = $1", customer_id).await, 0);
    assert_eq!(stock_of(&pool, first).await, 5);
    assert_eq!(stock_of(&pool, third).await, 5);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_failed_line_insert_rolls_back_written_header(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let ids = [
        product(&pool, "Tea", dec!(500), 5).await,
        product(&pool, "Cinnamon", dec!(300), 5).await,
        product(&pool, "Pepper", dec!(200), 5).await,
    ];
    sqlx::query(
        "CREATE FUNCTION reject_second_line() RETURNS trigger AS $$ \
         BEGIN IF NEW.line_no = 2 THEN RAISE EXCEPTION 'line rejected'; END IF; RETURN NEW; END \
         $$ LANGUAGE plpgsql",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("CREATE TRIGGER reject_second_line BEFORE INSERT ON order_items FOR EACH ROW EXECUTE FUNCTION reject_second_line()")
        .execute(&pool)
        .await
        .unwrap();
    let db = database(pool.clone());
    let (mailer, events) = (LogMailer, EventPublisher::default());

    let result = OrderAssembler::new(&db, &mailer, &events)
        .place(customer_id, &draft("ORD-2002", &[(ids[0], 1), (ids[1], 1), (ids[2], 1)]))
        .await;
    assert!(matches!(result, Err(CommerceError::Database(_))));

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM orders WHERE customer_id = $1", customer_id).await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM shipping_addresses WHERE customer_id = $1", customer_id).await, 0);
    assert_eq!(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM order_items").fetch_one(&pool).await.unwrap(), 0);
    for id in ids {
        assert_eq!(stock_of(&pool, id).await, 5);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_order_lines_keep_requested_order(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let mut ids = vec![product(&pool, "Tea", dec!(500), 5).await, product(&pool, "Cinnamon", dec!(300), 5).await];
    ids.sort();
    sqlx::query("UPDATE products SET name = 'Lower id' WHERE id = $1").bind(ids[0]).execute(&pool).await.unwrap();
    sqlx::query("UPDATE products SET name = 'Higher id' WHERE id = $1").bind(ids[1]).execute(&pool).await.unwrap();
    let db = database(pool.clone());
    let (mailer, events) = (LogMailer, EventPublisher::default());

    let placed = OrderAssembler::new(&db, &mailer, &events)
        .place(customer_id, &draft("ORD-2003", &[(ids[1], 1), (ids[0], 2)]))
        .await
        .unwrap();

    let order = OrderRepository::new(&db).get_for_customer(placed.order_id, customer_id).await.unwrap();
    let names: Vec<&str> = order.items.iter().map(|i| i.product_name.as_str()).collect();
    assert_eq!(names, ["Higher id", "Lower id"]);
    assert_eq!(order.items[1].quantity, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_unknown_payment_method_creates_nothing(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let tea = product(&pool, "Tea", dec!(500), 5).await;
    let db = database(pool.clone());
    let (mailer, events) = (LogMailer, EventPublisher::default());

    let mut order = draft("ORD-3001", &[(tea, 1)]);
    order.payment_method = "barter".into();
    let result = OrderAssembler::new(&db, &mailer, &events).place(customer_id, &order).await;
    assert!(matches!(result, Err(CommerceError::InvalidPaymentMethod(_))));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM orders WHERE customer_id = $1", customer_id).await, 0);
    assert_eq!(stock_of(&pool, tea).await, 5);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_cart_is_additive_and_guards_stock(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let tea = product(&pool, "Tea", dec!(500), 2).await;
    let db = database(pool);
    let carts = CartManager::new(&db, ShippingRule::default());
    let line = |quantity| CartLineInput { product_id: tea, quantity };

    carts.add_item(customer_id, &line(1)).await.unwrap();
    let cart = carts.add_item(customer_id, &line(1)).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);

    let err = carts.add_item(customer_id, &line(1)).await.unwrap_err();
    assert!(matches!(err, CommerceError::InsufficientStock { available: 2, .. }));
    assert_eq!(carts.summary(customer_id).await.unwrap().items[0].quantity, 2);

    let cart = carts.update_item(customer_id, tea, 0).await.unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.shipping, Decimal::ZERO);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_sync_skips_bad_lines(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let tea = product(&pool, "Tea", dec!(500), 3).await;
    let db = database(pool);
    let carts = CartManager::new(&db, ShippingRule::default());

    let outcome = carts
        .sync(customer_id, &[
            CartLineInput { product_id: tea, quantity: 2 },
            CartLineInput { product_id: Uuid::now_v7(), quantity: 1 },
            CartLineInput { product_id: tea, quantity: 5 },
        ])
        .await
        .unwrap();
    assert_eq!(outcome.cart.items[0].quantity, 2);
    assert_eq!(outcome.skipped.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_bogus_status_leaves_order_unchanged(pool: PgPool) {
    let customer_id = customer(&pool).await;
    let tea = product(&pool, "Tea", dec!(500), 5).await;
    let db = database(pool);
    let (mailer, events) = (LogMailer, EventPublisher::default());
    let placed = OrderAssembler::new(&db, &mailer, &events).place(customer_id, &draft("ORD-4001", &[(tea, 1)])).await.unwrap();

    let err = "bogus".parse::<OrderStatus>().map_err(CommerceError::from).unwrap_err();
    assert!(matches!(err, CommerceError::Validation(_)));

    let orders = OrderRepository::new(&db);
    assert_eq!(orders.get(placed.order_id).await.unwrap().order.order_status, OrderStatus::Pending);
    let change = orders.set_order_status(placed.order_id, OrderStatus::Shipped).await.unwrap();
    assert_eq!((change.from, change.to), (OrderStatus::Pending, OrderStatus::Shipped));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_inactive_product_reads_as_missing_for_customers(pool: PgPool) {
    let tea = product(&pool, "Tea", dec!(500), 5).await;
    sqlx::query("UPDATE products SET is_active = FALSE WHERE id = $1").bind(tea).execute(&pool).await.unwrap();
    let db = database(pool);
    let products = ProductRepository::new(&db);

    assert!(matches!(products.get(tea, false).await, Err(CommerceError::NotFound(_))));
    assert_eq!(products.get(tea, true).await.unwrap().product.id, tea);
}
