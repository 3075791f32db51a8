//! Promo codes. A code is valid when it exists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{conflict_as, expect_affected};
use crate::db::Database;
use crate::domain::value_objects::{non_negative, PromoCode};
use crate::{CommerceError, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Promo {
    pub id: Uuid,
    pub code: String,
    pub discount_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct NewPromo {
    pub code: PromoCode,
    pub discount_price: Decimal,
}

pub struct PromoRepository<'a> { db: &'a Database }

impl<'a> PromoRepository<'a> {
    pub const fn new(db: &'a Database) -> Self { Self { db } }

    pub async fn list(&self) -> Result<Vec<Promo>> {
        self.db.retry("promos.list", |pool| async move {
            sqlx::query_as::<_, Promo>("SELECT * FROM promos ORDER BY created_at DESC").fetch_all(&pool).await
        }).await
    }

    pub async fn find(&self, code: &PromoCode) -> Result<Promo> {
        let code = code.as_str();
        self.db.retry("promos.find", move |pool| async move {
            sqlx::query_as::<_, Promo>("SELECT * FROM promos WHERE code = $1").bind(code).fetch_optional(&pool).await
        }).await?.ok_or_else(|| CommerceError::validation("Invalid promo code"))
    }

    pub async fn create(&self, p: &NewPromo) -> Result<Promo> {
        non_negative("discount_price", p.discount_price)?;
        sqlx::query_as::<_, Promo>("INSERT INTO promos (id, code, discount_price) VALUES ($1, $2, $3) RETURNING *")
            .bind(Uuid::now_v7()).bind(p.code.as_str()).bind(p.discount_price)
            .fetch_one(self.db.pool()).await
            .map_err(|e| conflict_as(e, "Promo code already exists"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM promos WHERE id = $1").bind(id).execute(self.db.pool()).await?;
        expect_affected(result.rows_affected(), "Promo")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_promo_normalizes_code() {
        let p: NewPromo = serde_json::from_str(r#"{"code":" avurudu25 ","discount_price":250}"#).unwrap();
        assert_eq!(p.code.as_str(), "AVURUDU25");
        assert!(serde_json::from_str::<NewPromo>(r#"{"code":"  ","discount_price":250}"#).is_err());
    }
}
