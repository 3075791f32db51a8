//! Response envelope, error mapping and request extractors.
//!
//! Every response body is `{ "success": bool, "message"?: string, "data"?: ... }`,
//! including extractor rejections.

use axum::extract::rejection::{FormRejection, JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::CommerceError;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self { Self { success: true, message: None, data: Some(data) } }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self { success: true, message: Some(message.into()), data: Some(data) }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self { Self { success: true, message: Some(message.into()), data: None } }

    pub fn failure(message: impl Into<String>) -> Self { Self { success: false, message: Some(message.into()), data: None } }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response { Json(self).into_response() }
}

pub type ApiResult<T> = Result<ApiResponse<T>, CommerceError>;

pub fn status_code(error: &CommerceError) -> StatusCode {
    match error {
        CommerceError::Validation(_)
        | CommerceError::Inactive(_)
        | CommerceError::Conflict(_)
        | CommerceError::InsufficientStock { .. }
        | CommerceError::InvalidPaymentMethod(_) => StatusCode::BAD_REQUEST,
        CommerceError::NotFound(_) => StatusCode::NOT_FOUND,
        CommerceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        CommerceError::Forbidden(_) => StatusCode::FORBIDDEN,
        CommerceError::Transient(_) | CommerceError::Database(_) | CommerceError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for CommerceError {
    fn into_response(self) -> Response {
        let status = status_code(&self);
        // Server-side details stay in the log.
        let message = if self.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, ApiResponse::failure(message)).into_response()
    }
}

impl From<JsonRejection> for CommerceError {
    fn from(rejection: JsonRejection) -> Self { Self::Validation(rejection.body_text()) }
}

impl From<FormRejection> for CommerceError {
    fn from(rejection: FormRejection) -> Self { Self::Validation(rejection.body_text()) }
}

impl From<QueryRejection> for CommerceError {
    fn from(rejection: QueryRejection) -> Self { Self::Validation(rejection.body_text()) }
}

impl From<PathRejection> for CommerceError {
    fn from(rejection: PathRejection) -> Self { Self::Validation(rejection.body_text()) }
}

/// JSON body; malformed bodies and unknown keys become `Validation`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(CommerceError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(CommerceError))]
pub struct ApiForm<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(CommerceError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(CommerceError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_code(&CommerceError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_code(&CommerceError::Conflict("dup".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_code(&CommerceError::InsufficientStock { product: "Tea".into(), available: 0 }), StatusCode::BAD_REQUEST);
        assert_eq!(status_code(&CommerceError::not_found("Order")), StatusCode::NOT_FOUND);
        assert_eq!(status_code(&CommerceError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_code(&CommerceError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_code(&CommerceError::Database(sqlx::Error::PoolClosed)), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_envelope_shape() {
        let ok = serde_json::to_value(ApiResponse::ok(vec![1, 2])).unwrap();
        assert_eq!(ok, serde_json::json!({"success": true, "data": [1, 2]}));
        let failed = serde_json::to_value(ApiResponse::failure("Product not found")).unwrap();
        assert_eq!(failed, serde_json::json!({"success": false, "message": "Product not found"}));
    }

    #[test]
    fn test_server_errors_hide_details() {
        let response = CommerceError::Upstream("smtp password rejected".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
