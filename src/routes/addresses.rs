use axum::extract::State;
use validator::Validate;

use super::extract::CurrentCustomer;
use super::response::{ApiJson, ApiResponse, ApiResult};
use crate::domain::aggregates::{AddressInput, ShippingAddress};
use crate::repository::addresses::AddressRepository;
use crate::state::AppState;

pub async fn default_address(State(state): State<AppState>, customer: CurrentCustomer) -> ApiResult<Option<ShippingAddress>> {
    Ok(ApiResponse::ok(AddressRepository::new(&state.db).current_default(customer.id).await?))
}

/// Appends to the history; the newest entry becomes the default.
pub async fn save_default_address(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    ApiJson(address): ApiJson<AddressInput>,
) -> ApiResult<ShippingAddress> {
    address.validate()?;
    let saved = AddressRepository::new(&state.db).save_default(customer.id, &address).await?;
    Ok(ApiResponse::with_message("Default address saved", saved))
}

pub async fn address_history(State(state): State<AppState>, customer: CurrentCustomer) -> ApiResult<Vec<ShippingAddress>> {
    Ok(ApiResponse::ok(AddressRepository::new(&state.db).history(customer.id).await?))
}
