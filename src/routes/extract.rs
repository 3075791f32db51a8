//! Bearer-token extractors.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::services::auth::{Claims, Role};
use crate::state::AppState;
use crate::CommerceError;

/// An authenticated storefront customer.
#[derive(Debug, Clone)]
pub struct CurrentCustomer {
    pub id: Uuid,
    pub email: String,
}

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct CurrentAdmin {
    pub id: Uuid,
    pub email: String,
}

fn bearer_token(parts: &Parts) -> Result<&str, CommerceError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| CommerceError::Unauthorized("Authentication required".into()))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| CommerceError::Unauthorized("Invalid authorization header".into()))
}

fn claims_with_role(parts: &Parts, state: &AppState, role: Role) -> Result<Claims, CommerceError> {
    let claims = state.tokens.verify(bearer_token(parts)?)?;
    if claims.role != role {
        return Err(CommerceError::Forbidden("Access denied".into()));
    }
    Ok(claims)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentCustomer {
    type Rejection = CommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_with_role(parts, state, Role::Customer)?;
        Ok(Self { id: claims.id, email: claims.email })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = CommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = claims_with_role(parts, state, Role::Admin)?;
        Ok(Self { id: claims.id, email: claims.email })
    }
}
