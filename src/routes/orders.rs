//! Order endpoints: checkout, order history and admin status changes.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{CurrentAdmin, CurrentCustomer};
use super::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::domain::aggregates::{Order, OrderDraft, OrderStatus, OrderWithItems, PaymentStatus};
use crate::domain::events::DomainEvent;
use crate::repository::orders::{AdminOrder, OrderRepository};
use crate::repository::{PageParams, Paginated};
use crate::services::checkout::{OrderAssembler, PlacedOrder};
use crate::state::AppState;
use crate::CommerceError;

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusUpdate {
    pub status: String,
}

pub async fn place_order(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    ApiJson(draft): ApiJson<OrderDraft>,
) -> Result<(StatusCode, ApiResponse<PlacedOrder>), CommerceError> {
    let placed = OrderAssembler::new(&state.db, state.mailer.as_ref(), &state.events).place(customer.id, &draft).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Order placed successfully", placed)))
}

pub async fn my_orders(State(state): State<AppState>, customer: CurrentCustomer) -> ApiResult<Vec<OrderWithItems>> {
    Ok(ApiResponse::ok(OrderRepository::new(&state.db).list_for_customer(customer.id).await?))
}

pub async fn my_order(State(state): State<AppState>, customer: CurrentCustomer, ApiPath(id): ApiPath<Uuid>) -> ApiResult<OrderWithItems> {
    Ok(ApiResponse::ok(OrderRepository::new(&state.db).get_for_customer(id, customer.id).await?))
}

pub async fn admin_orders(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ApiQuery(filter): ApiQuery<OrderFilter>,
    ApiQuery(page): ApiQuery<PageParams>,
) -> ApiResult<Paginated<AdminOrder>> {
    let status = match filter.status.as_deref().map(str::trim).filter(|s| !s.is_empty() && *s != "all") {
        Some(raw) => Some(raw.parse::<OrderStatus>()?),
        None => None,
    };
    Ok(ApiResponse::ok(OrderRepository::new(&state.db).list_all(status, &page).await?))
}

pub async fn admin_order(State(state): State<AppState>, _admin: CurrentAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<OrderWithItems> {
    Ok(ApiResponse::ok(OrderRepository::new(&state.db).get(id).await?))
}

/// Any known status may be set; unknown values leave the order untouched.
pub async fn update_order_status(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> ApiResult<Order> {
    let status: OrderStatus = body.status.trim().parse()?;
    let orders = OrderRepository::new(&state.db);
    let change = orders.set_order_status(id, status).await?;
    tracing::info!(order_id = %id, admin_id = %admin.id, from = %change.from, to = %change.to, "Order status updated");
    if change.from != change.to {
        state.events.publish(DomainEvent::OrderStatusChanged { order_id: id, from: change.from, to: change.to }).await;
    }
    Ok(ApiResponse::with_message("Order status updated", orders.get(id).await?.order))
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    admin: CurrentAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> ApiResult<Order> {
    let status: PaymentStatus = body.status.trim().parse()?;
    let orders = OrderRepository::new(&state.db);
    let change = orders.set_payment_status(id, status).await?;
    tracing::info!(order_id = %id, admin_id = %admin.id, from = %change.from, to = %change.to, "Payment status updated");
    if change.from != change.to {
        state.events.publish(DomainEvent::PaymentStatusChanged { order_id: id, from: change.from, to: change.to }).await;
    }
    Ok(ApiResponse::with_message("Payment status updated", orders.get(id).await?.order))
}
