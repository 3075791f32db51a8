//! Delivery zones, payment methods and fee calculators.

use axum::extract::State;
use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::extract::CurrentAdmin;
use super::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::domain::pricing::{order_total, DeliveryZone, PaymentMethod, TotalBreakdown};
use crate::repository::pricing::{PaymentMethodUpdate, PricingRepository, ZoneInput};
use crate::state::AppState;
use crate::CommerceError;

#[derive(Debug, Deserialize)]
pub struct DeliveryQuote {
    pub zone_id: Uuid,
    pub total_weight: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DeliveryCharge {
    pub zone_id: Uuid,
    pub zone_name: String,
    pub total_weight: Decimal,
    pub delivery_charge: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct FeeQuote {
    pub payment_method: String,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PaymentFee {
    pub payment_method: String,
    pub percentage: Decimal,
    pub payment_fee: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TotalQuote {
    pub subtotal: Decimal,
    pub zone_id: Uuid,
    pub total_weight: Decimal,
    pub payment_method: String,
}

pub async fn list_zones(State(state): State<AppState>) -> ApiResult<Vec<DeliveryZone>> {
    Ok(ApiResponse::ok(PricingRepository::new(&state.db).zones().await?))
}

pub async fn calculate_delivery(State(state): State<AppState>, ApiJson(quote): ApiJson<DeliveryQuote>) -> ApiResult<DeliveryCharge> {
    let zone = PricingRepository::new(&state.db).zone(quote.zone_id).await?;
    let delivery_charge = zone.charge_for(quote.total_weight)?;
    Ok(ApiResponse::ok(DeliveryCharge { zone_id: zone.id, zone_name: zone.zone_name, total_weight: quote.total_weight, delivery_charge }))
}

pub async fn create_zone(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ApiJson(zone): ApiJson<ZoneInput>,
) -> Result<(StatusCode, ApiResponse<DeliveryZone>), CommerceError> {
    let created = PricingRepository::new(&state.db).create_zone(&zone).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Delivery zone created", created)))
}

pub async fn update_zone(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(zone): ApiJson<ZoneInput>,
) -> ApiResult<DeliveryZone> {
    let updated = PricingRepository::new(&state.db).update_zone(id, &zone).await?;
    Ok(ApiResponse::with_message("Delivery zone updated", updated))
}

pub async fn delete_zone(State(state): State<AppState>, _admin: CurrentAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    PricingRepository::new(&state.db).delete_zone(id).await?;
    Ok(ApiResponse::message("Delivery zone deleted"))
}

pub async fn list_payment_methods(State(state): State<AppState>) -> ApiResult<Vec<PaymentMethod>> {
    Ok(ApiResponse::ok(PricingRepository::new(&state.db).active_methods().await?))
}

pub async fn calculate_fee(State(state): State<AppState>, ApiJson(quote): ApiJson<FeeQuote>) -> ApiResult<PaymentFee> {
    let method = PricingRepository::new(&state.db).method_by_slug(&quote.payment_method).await?;
    let payment_fee = method.fee_for(quote.subtotal)?;
    Ok(ApiResponse::ok(PaymentFee { payment_method: method.slug, percentage: method.percentage, payment_fee }))
}

pub async fn calculate_total(State(state): State<AppState>, ApiJson(quote): ApiJson<TotalQuote>) -> ApiResult<TotalBreakdown> {
    let pricing = PricingRepository::new(&state.db);
    let zone = pricing.zone(quote.zone_id).await?;
    let method = pricing.method_by_slug(&quote.payment_method).await?;
    Ok(ApiResponse::ok(order_total(quote.subtotal, &zone, quote.total_weight, &method)?))
}

pub async fn admin_payment_methods(State(state): State<AppState>, _admin: CurrentAdmin) -> ApiResult<Vec<PaymentMethod>> {
    Ok(ApiResponse::ok(PricingRepository::new(&state.db).all_methods().await?))
}

pub async fn update_payment_method(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<PaymentMethodUpdate>,
) -> ApiResult<PaymentMethod> {
    let method = PricingRepository::new(&state.db).update_method(id, &update).await?;
    tracing::info!(method = %method.slug, admin_id = %admin.id, percentage = %method.percentage, is_active = method.is_active, "Payment method updated");
    Ok(ApiResponse::with_message("Payment method updated", method))
}
