//! Admin dashboard and sales reports.

use axum::extract::State;
use chrono::Utc;

use super::extract::CurrentAdmin;
use super::response::{ApiQuery, ApiResponse, ApiResult};
use crate::repository::reports::{Dashboard, ReportRepository, SalesDay, SalesRange};
use crate::state::AppState;

pub async fn dashboard(State(state): State<AppState>, _admin: CurrentAdmin) -> ApiResult<Dashboard> {
    Ok(ApiResponse::ok(ReportRepository::new(&state.db).dashboard().await?))
}

pub async fn sales(State(state): State<AppState>, _admin: CurrentAdmin, ApiQuery(range): ApiQuery<SalesRange>) -> ApiResult<Vec<SalesDay>> {
    let (from, to) = range.resolve(Utc::now().date_naive())?;
    Ok(ApiResponse::ok(ReportRepository::new(&state.db).sales(from, to).await?))
}
