//! Account endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use validator::Validate;

use super::extract::CurrentCustomer;
use super::response::{ApiJson, ApiResponse, ApiResult};
use crate::repository::customers::{Customer, CustomerRepository, ProfileUpdate, Registration};
use crate::services::auth::{AdminSession, AuthService, Credentials, CustomerSession, PasswordChange, PasswordReset};
use crate::state::AppState;
use crate::CommerceError;

#[derive(Debug, Deserialize)]
pub struct ForgotPassword {
    pub email: String,
}

fn auth_service(state: &AppState) -> AuthService<'_> { AuthService::new(&state.db, &state.tokens, state.mailer.as_ref()) }

pub async fn register(
    State(state): State<AppState>,
    ApiJson(registration): ApiJson<Registration>,
) -> Result<(StatusCode, ApiResponse<CustomerSession>), CommerceError> {
    let session = auth_service(&state).register(&registration).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Registration successful", session)))
}

pub async fn login(State(state): State<AppState>, ApiJson(credentials): ApiJson<Credentials>) -> ApiResult<CustomerSession> {
    let session = auth_service(&state).login(&credentials).await?;
    Ok(ApiResponse::with_message("Login successful", session))
}

pub async fn admin_login(State(state): State<AppState>, ApiJson(credentials): ApiJson<Credentials>) -> ApiResult<AdminSession> {
    let session = auth_service(&state).admin_login(&credentials).await?;
    tracing::info!(admin_id = %session.admin.id, "Admin logged in");
    Ok(ApiResponse::with_message("Login successful", session))
}

pub async fn profile(State(state): State<AppState>, customer: CurrentCustomer) -> ApiResult<Customer> {
    Ok(ApiResponse::ok(CustomerRepository::new(&state.db).get(customer.id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Customer> {
    update.validate()?;
    let updated = CustomerRepository::new(&state.db).update_profile(customer.id, &update).await?;
    Ok(ApiResponse::with_message("Profile updated", updated))
}

pub async fn change_password(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    ApiJson(change): ApiJson<PasswordChange>,
) -> ApiResult<()> {
    auth_service(&state).change_password(customer.id, &change).await?;
    Ok(ApiResponse::message("Password updated"))
}

pub async fn forgot_password(State(state): State<AppState>, ApiJson(body): ApiJson<ForgotPassword>) -> ApiResult<()> {
    auth_service(&state).forgot_password(&body.email).await?;
    Ok(ApiResponse::message("If the email is registered, a reset code has been sent"))
}

pub async fn reset_password(State(state): State<AppState>, ApiJson(reset): ApiJson<PasswordReset>) -> ApiResult<()> {
    auth_service(&state).reset_password(&reset).await?;
    Ok(ApiResponse::message("Password has been reset"))
}
