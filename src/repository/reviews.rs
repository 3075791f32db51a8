//! Product reviews.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Database;
use crate::domain::value_objects::Rating;
use crate::{CommerceError, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub product_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProductReviews {
    pub reviews: Vec<Review>,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewReview {
    pub rating: i64,
    pub comment: Option<String>,
}

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.customer_id, c.first_name || ' ' || c.last_name AS customer_name,
           r.product_id, r.rating, r.comment, r.created_at
    FROM reviews r
    JOIN customers c ON c.id = r.customer_id
"#;

pub struct ReviewRepository<'a> { db: &'a Database }

impl<'a> ReviewRepository<'a> {
    pub const fn new(db: &'a Database) -> Self { Self { db } }

    pub async fn for_product(&self, product_id: Uuid) -> Result<ProductReviews> {
        let sql = format!("{REVIEW_SELECT} WHERE r.product_id = $1 ORDER BY r.created_at DESC");
        let sql = sql.as_str();
        let reviews = self.db.retry("reviews.for_product", move |pool| async move {
            sqlx::query_as::<_, Review>(sql).bind(product_id).fetch_all(&pool).await
        }).await?;
        let review_count = i64::try_from(reviews.len()).unwrap_or(i64::MAX);
        let average_rating = (!reviews.is_empty()).then(|| {
            let sum: f64 = reviews.iter().map(|r| f64::from(r.rating)).sum();
            (sum / reviews.len() as f64 * 10.0).round() / 10.0
        });
        Ok(ProductReviews { reviews, average_rating, review_count })
    }

    /// One review per customer and product. The caller checks the purchase requirement.
    pub async fn create(&self, customer_id: Uuid, product_id: Uuid, review: &NewReview) -> Result<Review> {
        let rating = Rating::new(review.rating)?;
        let mut tx = self.db.begin().await?;
        // Serializes concurrent reviews by the same customer.
        sqlx::query("SELECT id FROM customers WHERE id = $1 FOR UPDATE").bind(customer_id).execute(&mut *tx).await?;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM reviews WHERE customer_id = $1 AND product_id = $2)")
            .bind(customer_id).bind(product_id)
            .fetch_one(&mut *tx).await?;
        if exists {
            return Err(CommerceError::Conflict("You have already reviewed this product".into()));
        }
        let id = Uuid::now_v7();
        let comment = review.comment.as_deref().map(str::trim).filter(|c| !c.is_empty());
        sqlx::query("INSERT INTO reviews (id, customer_id, product_id, rating, comment) VALUES ($1, $2, $3, $4, $5)")
            .bind(id).bind(customer_id).bind(product_id).bind(rating.value()).bind(comment)
            .execute(&mut *tx).await?;
        let sql = format!("{REVIEW_SELECT} WHERE r.id = $1");
        let created = sqlx::query_as::<_, Review>(&sql).bind(id).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(created)
    }
}
