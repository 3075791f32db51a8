//! Delivery zones and payment methods.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use super::{conflict_as, expect_affected};
use crate::db::Database;
use crate::domain::pricing::{check_percentage, DeliveryZone, PaymentMethod};
use crate::domain::value_objects::non_negative;
use crate::{CommerceError, Result};

const METHOD_COLUMNS: &str = "id, name, slug, percentage, is_active";

#[derive(Debug, Deserialize, Validate)]
pub struct ZoneInput {
    #[validate(length(min = 1, max = 100))]
    pub zone_name: String,
    pub base_charge: Decimal,
    pub extra_charge: Decimal,
    pub min_weight: Decimal,
}

impl ZoneInput {
    fn check(&self) -> Result<()> {
        self.validate()?;
        non_negative("base_charge", self.base_charge)?;
        non_negative("extra_charge", self.extra_charge)?;
        non_negative("min_weight", self.min_weight)?;
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentMethodUpdate {
    pub percentage: Option<Decimal>,
    pub is_active: Option<bool>,
}

pub struct PricingRepository<'a> { db: &'a Database }

impl<'a> PricingRepository<'a> {
    pub const fn new(db: &'a Database) -> Self { Self { db } }

    pub async fn zones(&self) -> Result<Vec<DeliveryZone>> {
        self.db.retry("zones.list", |pool| async move {
            sqlx::query_as::<_, DeliveryZone>("SELECT * FROM delivery_zones ORDER BY zone_name").fetch_all(&pool).await
        }).await
    }

    pub async fn zone(&self, id: Uuid) -> Result<DeliveryZone> {
        self.db.retry("zones.get", move |pool| async move {
            sqlx::query_as::<_, DeliveryZone>("SELECT * FROM delivery_zones WHERE id = $1").bind(id).fetch_optional(&pool).await
        }).await?.ok_or_else(|| CommerceError::not_found("Delivery zone"))
    }

    pub async fn create_zone(&self, z: &ZoneInput) -> Result<DeliveryZone> {
        z.check()?;
        sqlx::query_as::<_, DeliveryZone>(
            "INSERT INTO delivery_zones (id, zone_name, base_charge, extra_charge, min_weight) VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(Uuid::now_v7()).bind(z.zone_name.trim()).bind(z.base_charge).bind(z.extra_charge).bind(z.min_weight)
        .fetch_one(self.db.pool()).await
        .map_err(|e| conflict_as(e, "Delivery zone already exists"))
    }

    pub async fn update_zone(&self, id: Uuid, z: &ZoneInput) -> Result<DeliveryZone> {
        z.check()?;
        sqlx::query_as::<_, DeliveryZone>(
            "UPDATE delivery_zones SET zone_name = $2, base_charge = $3, extra_charge = $4, min_weight = $5 WHERE id = $1 RETURNING *",
        )
        .bind(id).bind(z.zone_name.trim()).bind(z.base_charge).bind(z.extra_charge).bind(z.min_weight)
        .fetch_optional(self.db.pool()).await
        .map_err(|e| conflict_as(e, "Delivery zone already exists"))?
        .ok_or_else(|| CommerceError::not_found("Delivery zone"))
    }

    pub async fn delete_zone(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM delivery_zones WHERE id = $1").bind(id).execute(self.db.pool()).await?;
        expect_affected(result.rows_affected(), "Delivery zone")
    }

    pub async fn active_methods(&self) -> Result<Vec<PaymentMethod>> {
        let sql = format!("SELECT {METHOD_COLUMNS} FROM payment_methods WHERE is_active ORDER BY name");
        let sql = sql.as_str();
        self.db.retry("payment_methods.active", move |pool| async move {
            sqlx::query_as::<_, PaymentMethod>(sql).fetch_all(&pool).await
        }).await
    }

    pub async fn all_methods(&self) -> Result<Vec<PaymentMethod>> {
        let sql = format!("SELECT {METHOD_COLUMNS} FROM payment_methods ORDER BY name");
        let sql = sql.as_str();
        self.db.retry("payment_methods.all", move |pool| async move {
            sqlx::query_as::<_, PaymentMethod>(sql).fetch_all(&pool).await
        }).await
    }

    pub async fn method_by_slug(&self, slug: &str) -> Result<PaymentMethod> {
        let sql = format!("SELECT {METHOD_COLUMNS} FROM payment_methods WHERE slug = $1");
        let (sql, slug) = (sql.as_str(), slug.trim());
        self.db.retry("payment_methods.by_slug", move |pool| async move {
            sqlx::query_as::<_, PaymentMethod>(sql).bind(slug).fetch_optional(&pool).await
        }).await?.ok_or_else(|| CommerceError::not_found("Payment method"))
    }

    pub async fn update_method(&self, id: Uuid, u: &PaymentMethodUpdate) -> Result<PaymentMethod> {
        let percentage = u.percentage.map(check_percentage).transpose()?;
        let sql = format!(
            "UPDATE payment_methods SET percentage = COALESCE($2, percentage), is_active = COALESCE($3, is_active) \
             WHERE id = $1 RETURNING {METHOD_COLUMNS}"
        );
        sqlx::query_as::<_, PaymentMethod>(&sql)
            .bind(id).bind(percentage).bind(u.is_active)
            .fetch_optional(self.db.pool()).await?
            .ok_or_else(|| CommerceError::not_found("Payment method"))
    }
}

/// Resolve a payment method inside the checkout transaction.
pub async fn method_by_slug_tx(conn: &mut PgConnection, slug: &str) -> Result<Option<PaymentMethod>> {
    let sql = format!("SELECT {METHOD_COLUMNS} FROM payment_methods WHERE slug = $1");
    Ok(sqlx::query_as::<_, PaymentMethod>(&sql).bind(slug.trim()).fetch_optional(conn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zone_input_rejects_negative_amounts() {
        let mut z = ZoneInput { zone_name: "Colombo".into(), base_charge: dec!(300), extra_charge: dec!(50), min_weight: dec!(5) };
        assert!(z.check().is_ok());
        z.extra_charge = dec!(-1);
        assert!(z.check().is_err());
    }

    #[test]
    fn test_method_update_rejects_unknown_fields() {
        assert!(serde_json::from_str::<PaymentMethodUpdate>(r#"{"slug":"cash"}"#).is_err());
        let u: PaymentMethodUpdate = serde_json::from_str(r#"{"percentage": 3.5}"#).unwrap();
        assert_eq!(u.percentage, Some(dec!(3.5)));
    }
}
