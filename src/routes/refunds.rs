//! Refund requests and admin decisions.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::extract::{CurrentAdmin, CurrentCustomer};
use super::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::domain::aggregates::{Refund, RefundStatus};
use crate::domain::events::DomainEvent;
use crate::repository::orders::OrderRepository;
use crate::repository::refunds::{RefundDecision, RefundRepository, RefundRequest};
use crate::state::AppState;
use crate::CommerceError;

#[derive(Debug, Default, Deserialize)]
pub struct RefundFilter {
    pub status: Option<String>,
}

pub async fn request_refund(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    ApiJson(request): ApiJson<RefundRequest>,
) -> Result<(StatusCode, ApiResponse<Refund>), CommerceError> {
    request.validate()?;
    if !OrderRepository::new(&state.db).contains_product(request.order_id, customer.id, request.product_id).await? {
        return Err(CommerceError::not_found("Order item"));
    }
    let refund = RefundRepository::new(&state.db).create(customer.id, &request).await?;
    tracing::info!(refund_id = %refund.id, order_id = %refund.order_id, "Refund requested");
    Ok((StatusCode::CREATED, ApiResponse::with_message("Refund request submitted", refund)))
}

pub async fn my_refunds(State(state): State<AppState>, customer: CurrentCustomer) -> ApiResult<Vec<Refund>> {
    Ok(ApiResponse::ok(RefundRepository::new(&state.db).list_for_customer(customer.id).await?))
}

pub async fn admin_refunds(State(state): State<AppState>, _admin: CurrentAdmin, ApiQuery(filter): ApiQuery<RefundFilter>) -> ApiResult<Vec<Refund>> {
    let status = match filter.status.as_deref().map(str::trim).filter(|s| !s.is_empty() && *s != "all") {
        Some(raw) => Some(raw.parse::<RefundStatus>()?),
        None => None,
    };
    Ok(ApiResponse::ok(RefundRepository::new(&state.db).list_all(status).await?))
}

pub async fn decide_refund(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(decision): ApiJson<RefundDecision>,
) -> ApiResult<Refund> {
    let next: RefundStatus = decision.status.parse()?;
    let notes = decision.admin_notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let (previous, refund) = RefundRepository::new(&state.db).decide(id, next, notes).await?;
    tracing::info!(refund_id = %id, admin_id = %admin.id, from = previous.as_str(), to = next.as_str(), "Refund status updated");
    if previous != next {
        state.events.publish(DomainEvent::RefundStatusChanged { refund_id: id, from: previous, to: next }).await;
    }
    Ok(ApiResponse::with_message("Refund updated", refund))
}
