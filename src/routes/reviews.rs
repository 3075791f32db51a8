//! Product reviews. Only customers who bought a product may review it.

use axum::extract::State;
use axum::http::StatusCode;
use uuid::Uuid;

use super::extract::CurrentCustomer;
use super::response::{ApiJson, ApiPath, ApiResponse, ApiResult};
use crate::repository::catalog::ProductRepository;
use crate::repository::orders::OrderRepository;
use crate::repository::reviews::{NewReview, ProductReviews, Review, ReviewRepository};
use crate::state::AppState;
use crate::CommerceError;

pub async fn product_reviews(State(state): State<AppState>, ApiPath(product_id): ApiPath<Uuid>) -> ApiResult<ProductReviews> {
    Ok(ApiResponse::ok(ReviewRepository::new(&state.db).for_product(product_id).await?))
}

pub async fn create_review(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    ApiPath(product_id): ApiPath<Uuid>,
    ApiJson(review): ApiJson<NewReview>,
) -> Result<(StatusCode, ApiResponse<Review>), CommerceError> {
    ProductRepository::new(&state.db).get(product_id, false).await?;
    if !OrderRepository::new(&state.db).has_purchased(customer.id, product_id).await? {
        return Err(CommerceError::Forbidden("You can only review products you have purchased".into()));
    }
    let created = ReviewRepository::new(&state.db).create(customer.id, product_id, &review).await?;
    tracing::info!(review_id = %created.id, %product_id, rating = created.rating, "Review added");
    Ok((StatusCode::CREATED, ApiResponse::with_message("Review added", created)))
}
