//! Persistence gateway.
//!
//! `Database` owns the `PostgreSQL` pool and is handed to repositories and
//! services explicitly. Reads go through [`Database::retry`], which re-runs a
//! query on transient connection failures; multi-statement writes go through
//! [`Database::begin`] and are never retried.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, Transaction};

use crate::config::DatabaseConfig;
use crate::{CommerceError, Result};

/// Bounded retry with linear backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self { Self { max_attempts: 3, backoff: Duration::from_millis(200) } }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration { self.backoff * attempt }
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    retry: RetryPolicy,
}

impl Database {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self { Self { pool, retry } }

    /// Open the pool with acquire and statement timeouts from configuration.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the URL is invalid or the first connection fails.
    pub async fn connect(config: &DatabaseConfig) -> std::result::Result<Self, sqlx::Error> {
        let statement_timeout = config.statement_timeout.as_millis().to_string();
        let options = PgConnectOptions::from_str(config.url.expose_secret())?
            .options([("statement_timeout", statement_timeout.as_str())]);
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;
        let retry = RetryPolicy { max_attempts: config.retry_attempts.max(1), backoff: config.retry_backoff };
        Ok(Self::new(pool, retry))
    }

    pub fn pool(&self) -> &PgPool { &self.pool }

    /// Run a read query, retrying transient failures per the retry policy.
    pub async fn retry<T, F, Fut>(&self, operation: &'static str, query: F) -> Result<T>
    where
        F: Fn(PgPool) -> Fut,
        Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        let mut attempt = 1;
        loop {
            match query(self.pool.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay(attempt);
                    tracing::warn!(operation, attempt, error = %e, ?delay, "Transient database error, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(CommerceError::from(e)),
            }
        }
    }

    /// Begin a transaction. Dropping it without `commit` rolls back and
    /// returns the connection to the pool.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }
}

/// Connection-level failures that are worth retrying.
pub fn is_transient(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map(|code| code.starts_with("08") || code.starts_with("57P0"))
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn lazy_db(max_attempts: u32) -> Database {
        let pool = PgPoolOptions::new().connect_lazy("postgres://localhost/storefront_test").unwrap();
        Database::new(pool, RetryPolicy { max_attempts, backoff: Duration::from_millis(1) })
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy { max_attempts: 3, backoff: Duration::from_millis(100) };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(3), Duration::from_millis(300));
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(is_transient(&sqlx::Error::Io(std::io::Error::from(std::io::ErrorKind::ConnectionReset))));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
    }

    #[tokio::test]
    async fn test_retry_stops_after_max_attempts() {
        let db = lazy_db(3);
        let calls = AtomicU32::new(0);
        let result: Result<()> = db
            .retry("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(sqlx::Error::PoolTimedOut) }
            })
            .await;
        assert!(matches!(result, Err(CommerceError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_permanent_errors() {
        let db = lazy_db(5);
        let calls = AtomicU32::new(0);
        let result: Result<()> = db
            .retry("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(sqlx::Error::RowNotFound) }
            })
            .await;
        assert!(matches!(result, Err(CommerceError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let db = lazy_db(3);
        let calls = AtomicU32::new(0);
        let result = db
            .retry("test", |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n == 0 { Err(sqlx::Error::PoolTimedOut) } else { Ok(42) } }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
    }
}
