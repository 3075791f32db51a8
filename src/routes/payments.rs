//! PayHere and Koko gateway endpoints.
//!
//! Checkout amounts are always taken from the stored order, never from the
//! request. Callbacks are applied only after their signature verifies.

use axum::extract::State;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::extract::CurrentCustomer;
use super::response::{ApiForm, ApiJson, ApiResponse, ApiResult};
use crate::domain::aggregates::{Order, PaymentStatus};
use crate::domain::value_objects::round_cents;
use crate::repository::orders::OrderRepository;
use crate::services::payments::koko::{Koko, KokoCheckout, KokoInitRequest, KokoNotification};
use crate::services::payments::payhere::{PayHere, PayHereCheckout, PayHereNotification};
use crate::services::payments::record_gateway_status;
use crate::state::AppState;
use crate::CommerceError;

#[derive(Debug, Deserialize)]
pub struct HashRequest {
    pub order_id: String,
    /// Optional client-side amount, checked against the stored total.
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct KokoVerification {
    pub order_id: String,
    pub status: String,
    pub payment_status: Option<PaymentStatus>,
}

fn payhere(state: &AppState) -> Result<&PayHere, CommerceError> {
    state.payhere.as_ref().ok_or_else(|| CommerceError::Upstream("PayHere is not configured".into()))
}

fn koko(state: &AppState) -> Result<&Koko, CommerceError> {
    state.koko.as_ref().ok_or_else(|| CommerceError::Upstream("Koko is not configured".into()))
}

/// The caller's order with this number. Other customers' orders read as missing.
async fn owned_order(state: &AppState, customer: &CurrentCustomer, order_number: &str) -> Result<Order, CommerceError> {
    OrderRepository::new(&state.db)
        .find_by_number(order_number.trim())
        .await?
        .filter(|order| order.customer_id == customer.id)
        .ok_or_else(|| CommerceError::not_found("Order"))
}

fn check_client_amount(order: &Order, claimed: Option<Decimal>) -> Result<(), CommerceError> {
    match claimed {
        Some(amount) if round_cents(amount) != round_cents(order.total) => {
            Err(CommerceError::validation(format!("Amount does not match order total {}", round_cents(order.total))))
        }
        _ => Ok(()),
    }
}

pub async fn payhere_hash(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    ApiJson(request): ApiJson<HashRequest>,
) -> ApiResult<PayHereCheckout> {
    let gateway = payhere(&state)?;
    let order = owned_order(&state, &customer, &request.order_id).await?;
    check_client_amount(&order, request.amount)?;
    Ok(ApiResponse::ok(gateway.checkout(&order.order_number, order.total)))
}

pub async fn payhere_notify(State(state): State<AppState>, ApiForm(notification): ApiForm<PayHereNotification>) -> ApiResult<()> {
    let gateway = payhere(&state)?;
    if !gateway.verify(&notification) {
        tracing::warn!(order_number = %notification.order_id, "PayHere notification failed signature check");
        return Err(CommerceError::validation("Invalid payment signature"));
    }
    record_gateway_status(&state.db, &state.events, "payhere", &notification.order_id, notification.payment_status()).await?;
    Ok(ApiResponse::message("Notification processed"))
}

pub async fn koko_initialize(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    ApiJson(request): ApiJson<KokoInitRequest>,
) -> ApiResult<KokoCheckout> {
    let gateway = koko(&state)?;
    let order = owned_order(&state, &customer, &request.order_id).await?;
    Ok(ApiResponse::ok(gateway.checkout(&request, order.total)))
}

async fn apply_koko(state: &AppState, notification: &KokoNotification) -> Result<KokoVerification, CommerceError> {
    let gateway = koko(state)?;
    if !gateway.verify(notification) {
        tracing::warn!(order_number = %notification.order_id, "Koko callback failed signature check");
        return Err(CommerceError::validation("Invalid payment signature"));
    }
    let payment_status = notification.payment_status();
    record_gateway_status(&state.db, &state.events, "koko", &notification.order_id, payment_status).await?;
    Ok(KokoVerification { order_id: notification.order_id.clone(), status: notification.status.clone(), payment_status })
}

/// Server-to-server callback, posted as a form.
pub async fn koko_notify(State(state): State<AppState>, ApiForm(notification): ApiForm<KokoNotification>) -> ApiResult<KokoVerification> {
    Ok(ApiResponse::with_message("Notification processed", apply_koko(&state, &notification).await?))
}

/// Browser-relayed result after the customer returns from Koko.
pub async fn koko_verify(State(state): State<AppState>, ApiJson(notification): ApiJson<KokoNotification>) -> ApiResult<KokoVerification> {
    Ok(ApiResponse::ok(apply_koko(&state, &notification).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn order(total: Decimal) -> Order {
        Order {
            id: Uuid::nil(),
            order_number: "ORD-1".into(),
            customer_id: Uuid::nil(),
            subtotal: total,
            shipping_fee: Decimal::ZERO,
            payment_fee: Decimal::ZERO,
            total,
            payment_method: Some("payhere".into()),
            order_status: Default::default(),
            payment_status: Default::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_client_amount_must_match_total() {
        let o = order(dec!(1290.00));
        assert!(check_client_amount(&o, None).is_ok());
        assert!(check_client_amount(&o, Some(dec!(1290))).is_ok());
        assert!(matches!(check_client_amount(&o, Some(dec!(1.00))), Err(CommerceError::Validation(_))));
    }
}
