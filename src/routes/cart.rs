//! Cart endpoints. Every route acts on the caller's own cart.

use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::CurrentCustomer;
use super::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::domain::aggregates::CartSummary;
use crate::services::cart::{CartLineInput, CartManager, QuantityInput, SyncOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    #[serde(default)]
    pub items: Vec<CartLineInput>,
}

fn manager(state: &AppState) -> CartManager<'_> { CartManager::new(&state.db, state.config.shipping) }

pub async fn get_cart(State(state): State<AppState>, customer: CurrentCustomer) -> ApiResult<CartSummary> {
    Ok(ApiResponse::ok(manager(&state).summary(customer.id).await?))
}

pub async fn add_item(State(state): State<AppState>, customer: CurrentCustomer, ApiJson(line): ApiJson<CartLineInput>) -> ApiResult<CartSummary> {
    let cart = manager(&state).add_item(customer.id, &line).await?;
    Ok(ApiResponse::with_message("Item added to cart", cart))
}

pub async fn update_item(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    ApiPath(product_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<QuantityInput>,
) -> ApiResult<CartSummary> {
    let cart = manager(&state).update_item(customer.id, product_id, body.quantity).await?;
    Ok(ApiResponse::with_message("Cart updated", cart))
}

pub async fn remove_item(State(state): State<AppState>, customer: CurrentCustomer, ApiPath(product_id): ApiPath<Uuid>) -> ApiResult<CartSummary> {
    let cart = manager(&state).remove_item(customer.id, product_id).await?;
    Ok(ApiResponse::with_message("Item removed from cart", cart))
}

pub async fn clear_cart(State(state): State<AppState>, customer: CurrentCustomer) -> ApiResult<CartSummary> {
    let cart = manager(&state).clear(customer.id).await?;
    Ok(ApiResponse::with_message("Cart cleared", cart))
}

pub async fn sync_cart(State(state): State<AppState>, customer: CurrentCustomer, ApiJson(body): ApiJson<SyncRequest>) -> ApiResult<SyncOutcome> {
    let outcome = manager(&state).sync(customer.id, &body.items).await?;
    Ok(ApiResponse::with_message("Cart synced", outcome))
}
