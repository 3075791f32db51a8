//! Products, product images, brands and categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use super::{conflict_as, expect_affected, PageParams, Paginated};
use crate::db::Database;
use crate::domain::aggregates::ProductStock;
use crate::domain::value_objects::non_negative;
use crate::services::images::UploadedImage;
use crate::{CommerceError, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub weight: Decimal,
    pub is_active: bool,
    pub brand_id: Option<Uuid>,
    pub brand_name: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub primary_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage { pub id: Uuid, pub product_id: Uuid, pub url: String, pub public_id: String, pub is_primary: bool, pub created_at: DateTime<Utc> }

#[derive(Debug, Serialize)]
pub struct ProductDetail { #[serde(flatten)] pub product: Product, pub images: Vec<ProductImage> }

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Brand { pub id: Uuid, pub name: String, pub created_at: DateTime<Utc> }

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category { pub id: Uuid, pub name: String, pub slug: String, pub created_at: DateTime<Utc> }

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter { pub category: Option<Uuid>, pub brand: Option<Uuid>, pub search: Option<String> }

#[derive(Debug, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock_quantity: i32,
    pub weight: Option<Decimal>,
    pub brand_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Fields an admin may change on a product. Unknown keys are rejected.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProductUpdate {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub remove_sale_price: bool,
    #[validate(range(min = 0))]
    pub stock_quantity: Option<i32>,
    pub weight: Option<Decimal>,
    pub is_active: Option<bool>,
    pub brand_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

impl NewProduct {
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        non_negative("price", self.price)?;
        if let Some(sale) = self.sale_price { non_negative("sale_price", sale)?; }
        if let Some(weight) = self.weight { non_negative("weight", weight)?; }
        Ok(())
    }
}

impl ProductUpdate {
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        for (field, value) in [("price", self.price), ("sale_price", self.sale_price), ("weight", self.weight)] {
            if let Some(v) = value { non_negative(field, v)?; }
        }
        Ok(())
    }
}

const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.name, p.description, p.price, p.sale_price, p.stock_quantity, p.weight, p.is_active,
           p.brand_id, b.name AS brand_name, p.category_id, c.name AS category_name,
           (SELECT i.url FROM product_images i WHERE i.product_id = p.id
             ORDER BY i.is_primary DESC, i.created_at LIMIT 1) AS primary_image,
           p.created_at, p.updated_at
    FROM products p
    LEFT JOIN brands b ON b.id = p.brand_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

const PRODUCT_FILTER: &str = r#"
    WHERE ($1 OR p.is_active)
      AND ($2::uuid IS NULL OR p.category_id = $2)
      AND ($3::uuid IS NULL OR p.brand_id = $3)
      AND ($4::text IS NULL OR p.name ILIKE '%' || $4 || '%')
"#;

const STOCK_SELECT: &str = r#"
    SELECT p.id, p.name, p.price, p.sale_price, p.stock_quantity, p.weight, p.is_active,
           (SELECT i.url FROM product_images i WHERE i.product_id = p.id
             ORDER BY i.is_primary DESC, i.created_at LIMIT 1) AS primary_image
    FROM products p
    WHERE p.id = $1
"#;

pub struct ProductRepository<'a> { db: &'a Database }

impl<'a> ProductRepository<'a> {
    pub const fn new(db: &'a Database) -> Self { Self { db } }

    pub async fn list(&self, filter: &ProductFilter, page: &PageParams, include_inactive: bool) -> Result<Paginated<Product>> {
        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let (category, brand) = (filter.category, filter.brand);
        let list_sql = format!("{PRODUCT_SELECT} {PRODUCT_FILTER} ORDER BY p.created_at DESC LIMIT $5 OFFSET $6");
        let count_sql = format!("SELECT COUNT(*) FROM products p {PRODUCT_FILTER}");
        let (list_sql, count_sql) = (list_sql.as_str(), count_sql.as_str());

        let items = self.db.retry("products.list", move |pool| async move {
            sqlx::query_as::<_, Product>(list_sql)
                .bind(include_inactive).bind(category).bind(brand).bind(search)
                .bind(page.limit()).bind(page.offset())
                .fetch_all(&pool).await
        }).await?;
        let total: i64 = self.db.retry("products.count", move |pool| async move {
            sqlx::query_scalar::<_, i64>(count_sql).bind(include_inactive).bind(category).bind(brand).bind(search).fetch_one(&pool).await
        }).await?;
        Ok(Paginated::new(items, total, page))
    }

    /// A product with its images; inactive products are only visible when `include_inactive`.
    pub async fn get(&self, id: Uuid, include_inactive: bool) -> Result<ProductDetail> {
        let sql = format!("{PRODUCT_SELECT} WHERE p.id = $1 AND ($2 OR p.is_active)");
        let sql = sql.as_str();
        let product = self.db.retry("products.get", move |pool| async move {
            sqlx::query_as::<_, Product>(sql).bind(id).bind(include_inactive).fetch_optional(&pool).await
        }).await?.ok_or_else(|| CommerceError::not_found("Product"))?;
        let images = self.images(id).await?;
        Ok(ProductDetail { product, images })
    }

    pub async fn create(&self, p: &NewProduct) -> Result<ProductDetail> {
        p.check()?;
        let id = Uuid::now_v7();
        sqlx::query(
            "INSERT INTO products (id, name, description, price, sale_price, stock_quantity, weight, is_active, brand_id, category_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(id).bind(&p.name).bind(&p.description).bind(p.price).bind(p.sale_price).bind(p.stock_quantity)
        .bind(p.weight.unwrap_or(Decimal::ZERO)).bind(p.is_active.unwrap_or(true)).bind(p.brand_id).bind(p.category_id)
        .execute(self.db.pool()).await?;
        tracing::info!(product_id = %id, name = %p.name, "Product created");
        self.get(id, true).await
    }

    pub async fn update(&self, id: Uuid, u: &ProductUpdate) -> Result<ProductDetail> {
        u.check()?;
        let result = sqlx::query(
            r#"UPDATE products SET
                 name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 price = COALESCE($4, price),
                 sale_price = CASE WHEN $5 THEN NULL ELSE COALESCE($6, sale_price) END,
                 stock_quantity = COALESCE($7, stock_quantity),
                 weight = COALESCE($8, weight),
                 is_active = COALESCE($9, is_active),
                 brand_id = COALESCE($10, brand_id),
                 category_id = COALESCE($11, category_id),
                 updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id).bind(&u.name).bind(&u.description).bind(u.price).bind(u.remove_sale_price).bind(u.sale_price)
        .bind(u.stock_quantity).bind(u.weight).bind(u.is_active).bind(u.brand_id).bind(u.category_id)
        .execute(self.db.pool()).await?;
        expect_affected(result.rows_affected(), "Product")?;
        self.get(id, true).await
    }

    /// Products are never hard-deleted; deactivation hides them from the catalog and carts.
    pub async fn deactivate(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id).execute(self.db.pool()).await?;
        expect_affected(result.rows_affected(), "Product")
    }

    pub async fn images(&self, product_id: Uuid) -> Result<Vec<ProductImage>> {
        self.db.retry("products.images", move |pool| async move {
            sqlx::query_as::<_, ProductImage>(
                "SELECT * FROM product_images WHERE product_id = $1 ORDER BY is_primary DESC, created_at",
            )
            .bind(product_id).fetch_all(&pool).await
        }).await
    }

    /// Record an uploaded image. The first image of a product, or one flagged primary, becomes the only primary.
    pub async fn add_image(&self, product_id: Uuid, image: &UploadedImage, primary: bool) -> Result<ProductImage> {
        let mut tx = self.db.begin().await?;
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_images WHERE product_id = $1")
            .bind(product_id).fetch_one(&mut *tx).await?;
        let primary = primary || existing == 0;
        if primary {
            sqlx::query("UPDATE product_images SET is_primary = FALSE WHERE product_id = $1")
                .bind(product_id).execute(&mut *tx).await?;
        }
        let row = sqlx::query_as::<_, ProductImage>(
            "INSERT INTO product_images (id, product_id, url, public_id, is_primary) VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::now_v7()).bind(product_id).bind(&image.url).bind(&image.public_id).bind(primary)
        .fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(row)
    }

    pub async fn remove_image(&self, image_id: Uuid) -> Result<ProductImage> {
        sqlx::query_as::<_, ProductImage>("DELETE FROM product_images WHERE id = $1 RETURNING *")
            .bind(image_id)
            .fetch_optional(self.db.pool()).await?
            .ok_or_else(|| CommerceError::not_found("Product image"))
    }

    pub async fn brands(&self) -> Result<Vec<Brand>> {
        self.db.retry("brands.list", |pool| async move {
            sqlx::query_as::<_, Brand>("SELECT * FROM brands ORDER BY name").fetch_all(&pool).await
        }).await
    }

    pub async fn create_brand(&self, name: &str) -> Result<Brand> {
        sqlx::query_as::<_, Brand>("INSERT INTO brands (id, name) VALUES ($1, $2) RETURNING *")
            .bind(Uuid::now_v7()).bind(name.trim())
            .fetch_one(self.db.pool()).await
            .map_err(|e| conflict_as(e, "Brand already exists"))
    }

    pub async fn delete_brand(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM brands WHERE id = $1").bind(id).execute(self.db.pool()).await?;
        expect_affected(result.rows_affected(), "Brand")
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.db.retry("categories.list", |pool| async move {
            sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name").fetch_all(&pool).await
        }).await
    }

    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        sqlx::query_as::<_, Category>("INSERT INTO categories (id, name, slug) VALUES ($1, $2, $3) RETURNING *")
            .bind(Uuid::now_v7()).bind(name).bind(slugify(name))
            .fetch_one(self.db.pool()).await
            .map_err(|e| conflict_as(e, "Category already exists"))
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(self.db.pool()).await?;
        expect_affected(result.rows_affected(), "Category")
    }
}

/// Read product state on the caller's connection without locking it.
pub async fn read_stock(conn: &mut PgConnection, id: Uuid) -> Result<Option<ProductStock>> {
    Ok(sqlx::query_as::<_, ProductStock>(STOCK_SELECT).bind(id).fetch_optional(conn).await?)
}

/// Lock a product row for the rest of the caller's transaction.
pub async fn lock_stock(conn: &mut PgConnection, id: Uuid) -> Result<Option<ProductStock>> {
    let sql = format!("{STOCK_SELECT} FOR UPDATE OF p");
    Ok(sqlx::query_as::<_, ProductStock>(&sql).bind(id).fetch_optional(conn).await?)
}

pub async fn decrement_stock(conn: &mut PgConnection, id: Uuid, quantity: i32) -> Result<()> {
    let result = sqlx::query("UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW() WHERE id = $1 AND stock_quantity >= $2")
        .bind(id).bind(quantity).execute(conn).await?;
    expect_affected(result.rows_affected(), "Product stock")
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
