//! Catalog endpoints: products, images, brands and categories.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::CurrentAdmin;
use super::response::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult};
use crate::repository::catalog::{Brand, Category, NewProduct, Product, ProductDetail, ProductFilter, ProductImage, ProductRepository, ProductUpdate};
use crate::repository::{PageParams, Paginated};
use crate::state::AppState;
use crate::CommerceError;

const IMAGE_FOLDER: &str = "products";

#[derive(Debug, Deserialize)]
pub struct ImageUpload {
    /// Base64 data URI.
    pub image: String,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Deserialize)]
pub struct NamedEntity {
    pub name: String,
}

fn require_name(body: &NamedEntity) -> Result<&str, CommerceError> {
    let name = body.name.trim();
    if name.is_empty() || name.len() > 100 {
        return Err(CommerceError::validation("Name must be between 1 and 100 characters"));
    }
    Ok(name)
}

pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<Paginated<Product>> {
    Ok(ApiResponse::ok(ProductRepository::new(&state.db).list(&filter, &page, false).await?))
}

pub async fn get_product(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<ProductDetail> {
    Ok(ApiResponse::ok(ProductRepository::new(&state.db).get(id, false).await?))
}

pub async fn admin_list_products(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(filter): ApiQuery<ProductFilter>,
) -> ApiResult<Paginated<Product>> {
    Ok(ApiResponse::ok(ProductRepository::new(&state.db).list(&filter, &page, true).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ApiJson(product): ApiJson<NewProduct>,
) -> Result<(StatusCode, ApiResponse<ProductDetail>), CommerceError> {
    let created = ProductRepository::new(&state.db).create(&product).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Product created", created)))
}

pub async fn update_product(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> ApiResult<ProductDetail> {
    let updated = ProductRepository::new(&state.db).update(id, &update).await?;
    tracing::info!(product_id = %id, "Product updated");
    Ok(ApiResponse::with_message("Product updated", updated))
}

pub async fn deactivate_product(State(state): State<AppState>, _admin: CurrentAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ProductRepository::new(&state.db).deactivate(id).await?;
    tracing::info!(product_id = %id, "Product deactivated");
    Ok(ApiResponse::message("Product deactivated"))
}

/// Upload to the image store, then record the row. If recording fails the
/// remote copy is destroyed so it is not orphaned.
pub async fn upload_image(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ApiPath(product_id): ApiPath<Uuid>,
    ApiJson(upload): ApiJson<ImageUpload>,
) -> Result<(StatusCode, ApiResponse<ProductImage>), CommerceError> {
    let products = ProductRepository::new(&state.db);
    products.get(product_id, true).await?;

    let uploaded = state.images.upload(&upload.image, IMAGE_FOLDER).await?;
    match products.add_image(product_id, &uploaded, upload.is_primary).await {
        Ok(image) => Ok((StatusCode::CREATED, ApiResponse::with_message("Image uploaded", image))),
        Err(e) => {
            if let Err(cleanup) = state.images.destroy(&uploaded.public_id).await {
                tracing::warn!(public_id = %uploaded.public_id, error = %cleanup, "Failed to remove orphaned image");
            }
            Err(e)
        }
    }
}

pub async fn delete_image(State(state): State<AppState>, _admin: CurrentAdmin, ApiPath(image_id): ApiPath<Uuid>) -> ApiResult<()> {
    let removed = ProductRepository::new(&state.db).remove_image(image_id).await?;
    if let Err(e) = state.images.destroy(&removed.public_id).await {
        tracing::warn!(%image_id, public_id = %removed.public_id, error = %e, "Remote image delete failed");
    }
    Ok(ApiResponse::message("Image deleted"))
}

pub async fn list_brands(State(state): State<AppState>) -> ApiResult<Vec<Brand>> {
    Ok(ApiResponse::ok(ProductRepository::new(&state.db).brands().await?))
}

pub async fn create_brand(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ApiJson(body): ApiJson<NamedEntity>,
) -> Result<(StatusCode, ApiResponse<Brand>), CommerceError> {
    let brand = ProductRepository::new(&state.db).create_brand(require_name(&body)?).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Brand created", brand)))
}

pub async fn delete_brand(State(state): State<AppState>, _admin: CurrentAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ProductRepository::new(&state.db).delete_brand(id).await?;
    Ok(ApiResponse::message("Brand deleted"))
}

pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    Ok(ApiResponse::ok(ProductRepository::new(&state.db).categories().await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    ApiJson(body): ApiJson<NamedEntity>,
) -> Result<(StatusCode, ApiResponse<Category>), CommerceError> {
    let category = ProductRepository::new(&state.db).create_category(require_name(&body)?).await?;
    Ok((StatusCode::CREATED, ApiResponse::with_message("Category created", category)))
}

pub async fn delete_category(State(state): State<AppState>, _admin: CurrentAdmin, ApiPath(id): ApiPath<Uuid>) -> ApiResult<()> {
    ProductRepository::new(&state.db).delete_category(id).await?;
    Ok(ApiResponse::message("Category deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_name() {
        assert_eq!(require_name(&NamedEntity { name: "  Dilmah ".into() }).unwrap(), "Dilmah");
        assert!(require_name(&NamedEntity { name: "   ".into() }).is_err());
        assert!(require_name(&NamedEntity { name: "x".repeat(101) }).is_err());
    }
}
