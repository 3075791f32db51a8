//! Promo code endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::CurrentAdmin;
use super::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::domain::value_objects::PromoCode;
use crate::repository::promos::{NewPromo, Promo, PromoRepository};
use crate::state::AppState;
use crate::CommerceError;

#[derive(Debug, Deserialize)]
pub struct PromoCheck {
    pub code: PromoCode,
}

pub async fn validate_promo(State(state): State<AppState>, ApiJson(body): ApiJson<PromoCheck>) -> ApiResult<Promo> {
    let promo = PromoRepository::new(&state.db).find(&body.code).await?;
    Ok(ApiResponse::with_message("Promo code applied", promo))
}

pub async fn list_promos(State(state): State<AppState>, _admin: CurrentAdmin) -> ApiResult<Vec<Promo>> {
    Ok(ApiResponse::ok(PromoRepository::new(&state.db).list().await?))
}

pub async fn create_promo(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ApiJson(promo): ApiJson<NewPromo>,
) -> Result<(StatusCode, ApiResponse<Promo>), CommerceError> {
    let created = PromoRepository::new(&state.db).create(&promo).await?;
    tracing::info!(code = %created.code, "Promo created");
    Ok((StatusCode::CREATED, ApiResponse::with_message("Promo created", created)))
}

pub async fn delete_promo(State(state): State<AppState>, _admin: CurrentAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    PromoRepository::new(&state.db).delete(id).await?;
    Ok(ApiResponse::message("Promo deleted"))
}
