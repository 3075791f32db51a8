use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::CurrentCustomer;
use super::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::repository::catalog::ProductRepository;
use crate::repository::wishlist::{WishlistEntry, WishlistRepository};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WishlistAdd {
    pub product_id: Uuid,
}

pub async fn list_wishlist(State(state): State<AppState>, customer: CurrentCustomer) -> ApiResult<Vec<WishlistEntry>> {
    Ok(ApiResponse::ok(WishlistRepository::new(&state.db).list(customer.id).await?))
}

pub async fn add_to_wishlist(State(state): State<AppState>, customer: CurrentCustomer, ApiJson(body): ApiJson<WishlistAdd>) -> ApiResult<()> {
    ProductRepository::new(&state.db).get(body.product_id, false).await?;
    let added = WishlistRepository::new(&state.db).add(customer.id, body.product_id).await?;
    Ok(ApiResponse::message(if added { "Added to wishlist" } else { "Already in wishlist" }))
}

pub async fn remove_from_wishlist(State(state): State<AppState>, customer: CurrentCustomer, ApiPath(product_id): ApiPath<Uuid>) -> ApiResult<()> {
    WishlistRepository::new(&state.db).remove(customer.id, product_id).await?;
    Ok(ApiResponse::message("Removed from wishlist"))
}
