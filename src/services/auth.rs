//! Authentication: bearer tokens, password hashing and account flows.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::AuthConfig;
use crate::db::Database;
use crate::repository::customers::{Admin, AdminRepository, Customer, CustomerRepository, Registration};
use crate::services::email::{self, Mailer};
use crate::{CommerceError, Result};

const MIN_PASSWORD_LENGTH: usize = 8;
const RESET_CODE_TTL_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { Customer, Admin }

/// Token payload: `{id, type, email, iat, exp}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub role: Role,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: SecretString,
    ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self { Self { secret: config.jwt_secret.clone(), ttl: config.token_ttl } }

    pub fn issue(&self, id: Uuid, role: Role, email: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims { id, role, email: email.to_string(), iat: now.timestamp(), exp: (now + self.ttl).timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()))
            .map_err(|e| CommerceError::Upstream(format!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()), &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => CommerceError::Unauthorized("Token expired".into()),
                _ => CommerceError::Unauthorized("Invalid token".into()),
            })
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CommerceError::Upstream(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

fn check_password_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CommerceError::validation(format!("Password must be at least {MIN_PASSWORD_LENGTH} characters")));
    }
    Ok(())
}

/// Six-digit password reset code.
pub fn generate_reset_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000u32).to_string()
}

#[derive(Debug, Serialize)]
pub struct CustomerSession { pub token: String, pub customer: Customer }

#[derive(Debug, Serialize)]
pub struct AdminSession { pub token: String, pub admin: Admin }

#[derive(Debug, Deserialize)]
pub struct Credentials { pub email: String, pub password: String }

#[derive(Debug, Deserialize)]
pub struct PasswordChange { pub current_password: String, pub new_password: String }

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordReset {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6))]
    pub code: String,
    pub new_password: String,
}

/// Account flows over the customer and admin tables.
pub struct AuthService<'a> {
    db: &'a Database,
    tokens: &'a TokenService,
    mailer: &'a dyn Mailer,
}

impl<'a> AuthService<'a> {
    pub fn new(db: &'a Database, tokens: &'a TokenService, mailer: &'a dyn Mailer) -> Self { Self { db, tokens, mailer } }

    pub async fn register(&self, registration: &Registration) -> Result<CustomerSession> {
        registration.validate()?;
        check_password_strength(&registration.password)?;
        let hash = hash_password(&registration.password)?;
        let customer = CustomerRepository::new(self.db).create(registration, &hash).await?;
        tracing::info!(customer_id = %customer.id, "Customer registered");
        let token = self.tokens.issue(customer.id, Role::Customer, &customer.email)?;
        Ok(CustomerSession { token, customer })
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<CustomerSession> {
        let customer = CustomerRepository::new(self.db)
            .find_by_email(&credentials.email)
            .await?
            .filter(|c| verify_password(&credentials.password, &c.password_hash))
            .ok_or_else(|| CommerceError::Unauthorized("Invalid email or password".into()))?;
        if !customer.is_active {
            return Err(CommerceError::Forbidden("Account is disabled".into()));
        }
        let token = self.tokens.issue(customer.id, Role::Customer, &customer.email)?;
        Ok(CustomerSession { token, customer })
    }

    pub async fn admin_login(&self, credentials: &Credentials) -> Result<AdminSession> {
        let admin = AdminRepository::new(self.db)
            .find_by_email(&credentials.email)
            .await?
            .filter(|a| a.is_active && verify_password(&credentials.password, &a.password_hash))
            .ok_or_else(|| CommerceError::Unauthorized("Invalid email or password".into()))?;
        let token = self.tokens.issue(admin.id, Role::Admin, &admin.email)?;
        Ok(AdminSession { token, admin })
    }

    pub async fn change_password(&self, customer_id: Uuid, change: &PasswordChange) -> Result<()> {
        let customers = CustomerRepository::new(self.db);
        let customer = customers.get(customer_id).await?;
        if !verify_password(&change.current_password, &customer.password_hash) {
            return Err(CommerceError::validation("Current password is incorrect"));
        }
        check_password_strength(&change.new_password)?;
        customers.set_password(customer_id, &hash_password(&change.new_password)?).await
    }

    /// Email a reset code. Unknown addresses succeed silently so accounts cannot be probed.
    pub async fn forgot_password(&self, email_address: &str) -> Result<()> {
        let customers = CustomerRepository::new(self.db);
        let Some(customer) = customers.find_by_email(email_address).await? else {
            tracing::info!("Password reset requested for unknown email");
            return Ok(());
        };
        let code = generate_reset_code();
        let expires_at = Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES);
        customers.set_reset_code(customer.id, &code, expires_at).await?;
        let html = email::reset_code_html(&customer.first_name, &code);
        if let Err(e) = self.mailer.send(&customer.email, "Your password reset code", &html).await {
            tracing::warn!(customer_id = %customer.id, error = %e, "Password reset email failed");
        }
        Ok(())
    }

    pub async fn reset_password(&self, reset: &PasswordReset) -> Result<()> {
        reset.validate()?;
        check_password_strength(&reset.new_password)?;
        let customers = CustomerRepository::new(self.db);
        let invalid = || CommerceError::validation("Invalid or expired reset code");
        let customer = customers.find_by_email(&reset.email).await?.ok_or_else(invalid)?;
        let valid = match (&customer.reset_code, customer.reset_code_expires_at) {
            (Some(code), Some(expires_at)) => code == reset.code.trim() && expires_at > Utc::now(),
            _ => false,
        };
        if !valid {
            return Err(invalid());
        }
        customers.set_password(customer.id, &hash_password(&reset.new_password)?).await
    }

    /// Create the first admin from configuration when no admin exists yet.
    pub async fn bootstrap_admin(&self, email_address: &str, password: &SecretString) -> Result<()> {
        let admins = AdminRepository::new(self.db);
        if admins.count().await? > 0 {
            return Ok(());
        }
        check_password_strength(password.expose_secret())?;
        let admin = admins.create("Administrator", email_address, &hash_password(password.expose_secret())?).await?;
        tracing::info!(admin_id = %admin.id, email = %admin.email, "Bootstrap admin created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
            token_ttl: Duration::hours(1),
        })
    }

    #[test]
    fn test_token_roundtrip_carries_role() {
        let service = tokens();
        let id = Uuid::now_v7();
        let token = service.issue(id, Role::Admin, "admin@example.com").unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_claims_use_type_key() {
        let claims = Claims { id: Uuid::nil(), role: Role::Customer, email: "a@b.c".into(), iat: 0, exp: 1 };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "customer");
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let other = TokenService::new(&AuthConfig {
            jwt_secret: SecretString::from("another-secret-another-secret-xx".to_string()),
            token_ttl: Duration::hours(1),
        });
        let token = other.issue(Uuid::now_v7(), Role::Customer, "a@b.c").unwrap();
        assert!(matches!(tokens().verify(&token), Err(CommerceError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = TokenService { ttl: Duration::hours(-2), ..tokens() };
        let token = service.issue(Uuid::now_v7(), Role::Customer, "a@b.c").unwrap();
        assert!(matches!(service.verify(&token), Err(CommerceError::Unauthorized(ref m)) if m == "Token expired"));
    }

    #[test]
    fn test_password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_reset_code_is_six_digits() {
        for _ in 0..50 {
            let code = generate_reset_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
