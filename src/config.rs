//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `JWT_SECRET` - Token signing secret (min 32 chars)
//!
//! ## Optional
//! - `HOST` / `PORT` - Bind address (default: 0.0.0.0:8083)
//! - `DB_MAX_CONNECTIONS`, `DB_ACQUIRE_TIMEOUT_SECS`, `DB_STATEMENT_TIMEOUT_MS`
//! - `DB_RETRY_ATTEMPTS`, `DB_RETRY_BACKOFF_MS` - Read retry policy
//! - `JWT_TTL_HOURS` - Token lifetime (default: 168)
//! - `FREE_SHIPPING_THRESHOLD`, `FLAT_SHIPPING_FEE` - Cart shipping rule
//! - `NATS_URL` - Domain event bus
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `MAIL_FROM`
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`
//! - `PAYHERE_MERCHANT_ID`, `PAYHERE_MERCHANT_SECRET`, `PAYHERE_CURRENCY`
//! - `KOKO_MERCHANT_ID`, `KOKO_SECRET`, `KOKO_RETURN_URL`, `KOKO_CANCEL_URL`, `KOKO_NOTIFY_URL`
//! - `ADMIN_BOOTSTRAP_EMAIL`, `ADMIN_BOOTSTRAP_PASSWORD` - First admin account

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

pub use crate::domain::aggregates::ShippingRule;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub shipping: ShippingRule,
    pub nats_url: Option<String>,
    pub smtp: Option<SmtpConfig>,
    pub cloudinary: Option<CloudinaryConfig>,
    pub payhere: Option<PayHereConfig>,
    pub koko: Option<KokoConfig>,
    pub bootstrap_admin: Option<(String, SecretString)>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub statement_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: SecretString,
    pub token_ttl: chrono::Duration,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

#[derive(Debug, Clone)]
pub struct PayHereConfig {
    pub merchant_id: String,
    pub merchant_secret: SecretString,
    pub currency: String,
}

#[derive(Debug, Clone)]
pub struct KokoConfig {
    pub merchant_id: String,
    pub secret: SecretString,
    pub return_url: String,
    pub cancel_url: String,
    pub notify_url: String,
}

impl AppConfig {
    /// Load configuration from the environment, honouring a `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let jwt_secret = get_required_env("JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::InvalidEnvVar(
                "JWT_SECRET".to_string(),
                format!("must be at least {MIN_JWT_SECRET_LENGTH} characters"),
            ));
        }

        let defaults = ShippingRule::default();
        Ok(Self {
            host: parse_env_or("HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_env_or("PORT", 8083)?,
            database: DatabaseConfig {
                url: SecretString::from(get_required_env("DATABASE_URL")?),
                max_connections: parse_env_or("DB_MAX_CONNECTIONS", 10)?,
                acquire_timeout: Duration::from_secs(parse_env_or("DB_ACQUIRE_TIMEOUT_SECS", 10)?),
                statement_timeout: Duration::from_millis(parse_env_or("DB_STATEMENT_TIMEOUT_MS", 30_000)?),
                retry_attempts: parse_env_or("DB_RETRY_ATTEMPTS", 3)?,
                retry_backoff: Duration::from_millis(parse_env_or("DB_RETRY_BACKOFF_MS", 200)?),
            },
            auth: AuthConfig {
                jwt_secret: SecretString::from(jwt_secret),
                token_ttl: chrono::Duration::hours(parse_env_or("JWT_TTL_HOURS", 168)?),
            },
            shipping: ShippingRule {
                free_threshold: parse_env_or("FREE_SHIPPING_THRESHOLD", defaults.free_threshold)?,
                flat_fee: parse_env_or("FLAT_SHIPPING_FEE", defaults.flat_fee)?,
            },
            nats_url: get_optional_env("NATS_URL"),
            smtp: SmtpConfig::from_env()?,
            cloudinary: CloudinaryConfig::from_env(),
            payhere: PayHereConfig::from_env(),
            koko: KokoConfig::from_env(),
            bootstrap_admin: get_optional_env("ADMIN_BOOTSTRAP_EMAIL")
                .zip(get_optional_env("ADMIN_BOOTSTRAP_PASSWORD").map(SecretString::from)),
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

impl SmtpConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(host) = get_optional_env("SMTP_HOST") else { return Ok(None) };
        Ok(Some(Self {
            host,
            port: parse_env_or("SMTP_PORT", 587)?,
            username: get_required_env("SMTP_USERNAME")?,
            password: SecretString::from(get_required_env("SMTP_PASSWORD")?),
            from_address: get_required_env("MAIL_FROM")?,
        }))
    }
}

impl CloudinaryConfig {
    fn from_env() -> Option<Self> {
        Some(Self {
            cloud_name: get_optional_env("CLOUDINARY_CLOUD_NAME")?,
            api_key: get_optional_env("CLOUDINARY_API_KEY")?,
            api_secret: SecretString::from(get_optional_env("CLOUDINARY_API_SECRET")?),
        })
    }
}

impl PayHereConfig {
    fn from_env() -> Option<Self> {
        Some(Self {
            merchant_id: get_optional_env("PAYHERE_MERCHANT_ID")?,
            merchant_secret: SecretString::from(get_optional_env("PAYHERE_MERCHANT_SECRET")?),
            currency: get_optional_env("PAYHERE_CURRENCY").unwrap_or_else(|| "LKR".to_string()),
        })
    }
}

impl KokoConfig {
    fn from_env() -> Option<Self> {
        Some(Self {
            merchant_id: get_optional_env("KOKO_MERCHANT_ID")?,
            secret: SecretString::from(get_optional_env("KOKO_SECRET")?),
            return_url: get_optional_env("KOKO_RETURN_URL").unwrap_or_default(),
            cancel_url: get_optional_env("KOKO_CANCEL_URL").unwrap_or_default(),
            notify_url: get_optional_env("KOKO_NOTIFY_URL").unwrap_or_default(),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u16>("PORT", " 9000 ").unwrap(), 9000);
        assert_eq!(parse_value::<Decimal>("FLAT_SHIPPING_FEE", "350.50").unwrap(), dec!(350.50));
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().starts_with("Invalid environment variable PORT"));
    }

    #[test]
    fn test_default_shipping_rule() {
        let rule = ShippingRule::default();
        assert_eq!(rule.free_threshold, dec!(10000));
        assert_eq!(rule.flat_fee, dec!(500));
    }
}
