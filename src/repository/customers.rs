//! Customer and admin accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{conflict_as, expect_affected};
use crate::db::Database;
use crate::{CommerceError, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub reset_code: Option<String>,
    #[serde(skip_serializing)]
    pub reset_code_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Admin {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

/// Profile fields a customer may change. Unknown keys are rejected.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

pub struct CustomerRepository<'a> { db: &'a Database }

impl<'a> CustomerRepository<'a> {
    pub const fn new(db: &'a Database) -> Self { Self { db } }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Customer>> {
        let email = normalize_email(email);
        let email = email.as_str();
        self.db.retry("customers.by_email", move |pool| async move {
            sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE email = $1").bind(email).fetch_optional(&pool).await
        }).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Customer> {
        self.db.retry("customers.get", move |pool| async move {
            sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1").bind(id).fetch_optional(&pool).await
        }).await?.ok_or_else(|| CommerceError::not_found("Customer"))
    }

    pub async fn create(&self, r: &Registration, password_hash: &str) -> Result<Customer> {
        sqlx::query_as::<_, Customer>(
            "INSERT INTO customers (id, first_name, last_name, email, phone, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(Uuid::now_v7()).bind(r.first_name.trim()).bind(r.last_name.trim())
        .bind(normalize_email(&r.email)).bind(&r.phone).bind(password_hash)
        .fetch_one(self.db.pool()).await
        .map_err(|e| conflict_as(e, "An account with this email already exists"))
    }

    pub async fn update_profile(&self, id: Uuid, u: &ProfileUpdate) -> Result<Customer> {
        sqlx::query_as::<_, Customer>(
            "UPDATE customers SET first_name = COALESCE($2, first_name), last_name = COALESCE($3, last_name), \
             phone = COALESCE($4, phone), updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id).bind(&u.first_name).bind(&u.last_name).bind(&u.phone)
        .fetch_optional(self.db.pool()).await?
        .ok_or_else(|| CommerceError::not_found("Customer"))
    }

    /// Replace the password hash and invalidate any outstanding reset code.
    pub async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE customers SET password_hash = $2, reset_code = NULL, reset_code_expires_at = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(id).bind(password_hash).execute(self.db.pool()).await?;
        expect_affected(result.rows_affected(), "Customer")
    }

    pub async fn set_reset_code(&self, id: Uuid, code: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE customers SET reset_code = $2, reset_code_expires_at = $3, updated_at = NOW() WHERE id = $1")
            .bind(id).bind(code).bind(expires_at).execute(self.db.pool()).await?;
        expect_affected(result.rows_affected(), "Customer")
    }
}

pub struct AdminRepository<'a> { db: &'a Database }

impl<'a> AdminRepository<'a> {
    pub const fn new(db: &'a Database) -> Self { Self { db } }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Admin>> {
        let email = normalize_email(email);
        let email = email.as_str();
        self.db.retry("admins.by_email", move |pool| async move {
            sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE email = $1").bind(email).fetch_optional(&pool).await
        }).await
    }

    pub async fn count(&self) -> Result<i64> {
        self.db.retry("admins.count", |pool| async move {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM admins").fetch_one(&pool).await
        }).await
    }

    pub async fn create(&self, name: &str, email: &str, password_hash: &str) -> Result<Admin> {
        sqlx::query_as::<_, Admin>("INSERT INTO admins (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING *")
            .bind(Uuid::now_v7()).bind(name).bind(normalize_email(email)).bind(password_hash)
            .fetch_one(self.db.pool()).await
            .map_err(|e| conflict_as(e, "Admin already exists"))
    }
}
