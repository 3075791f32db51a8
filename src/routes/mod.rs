//! HTTP layer: router, extractors and the error-to-status mapping.

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod extract;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod promos;
pub mod refunds;
pub mod reports;
pub mod response;
pub mod reviews;
pub mod wishlist;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use response::ApiResponse;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .nest("/api", api_routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/profile", get(auth::profile).put(auth::update_profile))
        .route("/auth/password", put(auth::change_password))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/admin/login", post(auth::admin_login))
        // Catalog
        .route("/products", get(catalog::list_products).post(catalog::create_product))
        .route("/products/admin/all", get(catalog::admin_list_products))
        .route(
            "/products/:id",
            get(catalog::get_product).put(catalog::update_product).delete(catalog::deactivate_product),
        )
        .route("/products/:id/images", post(catalog::upload_image))
        .route("/products/images/:image_id", delete(catalog::delete_image))
        .route("/products/:id/reviews", get(reviews::product_reviews).post(reviews::create_review))
        .route("/brands", get(catalog::list_brands).post(catalog::create_brand))
        .route("/brands/:id", delete(catalog::delete_brand))
        .route("/categories", get(catalog::list_categories).post(catalog::create_category))
        .route("/categories/:id", delete(catalog::delete_category))
        // Cart
        .route("/cart", get(cart::get_cart).post(cart::add_item).delete(cart::clear_cart))
        .route("/cart/sync", post(cart::sync_cart))
        .route("/cart/:product_id", put(cart::update_item).delete(cart::remove_item))
        // Orders
        .route("/orders", get(orders::my_orders).post(orders::place_order))
        .route("/orders/admin", get(orders::admin_orders))
        .route("/orders/admin/:id", get(orders::admin_order))
        .route("/orders/admin/:id/status", put(orders::update_order_status))
        .route("/orders/admin/:id/payment-status", put(orders::update_payment_status))
        .route("/orders/:id", get(orders::my_order))
        // Pricing
        .route("/delivery/zones", get(pricing::list_zones).post(pricing::create_zone))
        .route("/delivery/zones/:id", put(pricing::update_zone).delete(pricing::delete_zone))
        .route("/delivery/calculate", post(pricing::calculate_delivery))
        .route("/payment-methods", get(pricing::list_payment_methods))
        .route("/payment-methods/admin", get(pricing::admin_payment_methods))
        .route("/payment-methods/admin/:id", put(pricing::update_payment_method))
        .route("/payment/calculate-fee", post(pricing::calculate_fee))
        .route("/payment/calculate-total", post(pricing::calculate_total))
        // Promos
        .route("/promos", get(promos::list_promos).post(promos::create_promo))
        .route("/promos/validate", post(promos::validate_promo))
        .route("/promos/:id", delete(promos::delete_promo))
        // Payment gateways
        .route("/payhere/generate-hash", post(payments::payhere_hash))
        .route("/payhere/notify", post(payments::payhere_notify))
        .route("/koko-payment/initialize", post(payments::koko_initialize))
        .route("/koko-payment/notify", post(payments::koko_notify))
        .route("/koko-payment/verify", post(payments::koko_verify))
        // Customer account
        .route("/wishlist", get(wishlist::list_wishlist).post(wishlist::add_to_wishlist))
        .route("/wishlist/:product_id", delete(wishlist::remove_from_wishlist))
        .route("/refunds", get(refunds::my_refunds).post(refunds::request_refund))
        .route("/refunds/admin", get(refunds::admin_refunds))
        .route("/refunds/admin/:id", put(refunds::decide_refund))
        .route("/addresses/default", get(addresses::default_address).post(addresses::save_default_address))
        .route("/addresses/history", get(addresses::address_history))
        // Reports
        .route("/admin/dashboard", get(reports::dashboard))
        .route("/admin/reports/sales", get(reports::sales))
}

async fn health() -> ApiResponse<Value> {
    ApiResponse::ok(json!({ "status": "ok", "service": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION") }))
}

/// Ready once the database answers.
async fn ready(State(state): State<AppState>) -> (StatusCode, ApiResponse<Value>) {
    match sqlx::query("SELECT 1").execute(state.db.pool()).await {
        Ok(_) => (StatusCode::OK, ApiResponse::ok(json!({ "status": "ready", "database": "ok" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse { success: false, message: Some("Database unavailable".into()), data: Some(json!({ "status": "not_ready" })) },
            )
        }
    }
}

async fn not_found() -> (StatusCode, ApiResponse<()>) { (StatusCode::NOT_FOUND, ApiResponse::failure("Route not found")) }
