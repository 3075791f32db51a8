//! Database-backed account flow tests.
//!
//! Run with a PostgreSQL `DATABASE_URL` and `cargo test -- --ignored`.

use async_trait::async_trait;
use chrono::Duration;
use secrecy::SecretString;
use sqlx::PgPool;
use storefront_commerce::config::AuthConfig;
use storefront_commerce::db::{Database, RetryPolicy};
use storefront_commerce::services::auth::{AuthService, TokenService};
use storefront_commerce::services::email::{EmailError, Mailer};
use uuid::Uuid;

struct RefusingMailer;

#[async_trait]
impl Mailer for RefusingMailer {
    async fn send(&self, to: &str, _subject: &str, _html: &str) -> Result<(), EmailError> {
        Err(EmailError::InvalidAddress(to.to_string()))
    }
}

fn tokens() -> TokenService {
    TokenService::new(&AuthConfig {
        jwt_secret: SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
        token_ttl: Duration::hours(1),
    })
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_forgot_password_answers_alike_when_mail_fails(pool: PgPool) {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO customers (id, first_name, last_name, email, password_hash) VALUES ($1, 'Nimali', 'Silva', 'nimali@example.com', 'x')")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();
    let db = Database::new(pool.clone(), RetryPolicy::default());
    let tokens = tokens();
    let accounts = AuthService::new(&db, &tokens, &RefusingMailer);

    assert!(accounts.forgot_password("nobody@example.com").await.is_ok());
    assert!(accounts.forgot_password("nimali@example.com").await.is_ok());

    let code: Option<String> = sqlx::query_scalar("SELECT reset_code FROM customers WHERE id = $1").bind(id).fetch_one(&pool).await.unwrap();
    assert_eq!(code.map(|c| c.len()), Some(6));
}
