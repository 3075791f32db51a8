//! Storefront Commerce - storefront and admin API server

use anyhow::{Context, Result};
use storefront_commerce::config::AppConfig;
use storefront_commerce::db::Database;
use storefront_commerce::routes;
use storefront_commerce::services::auth::AuthService;
use storefront_commerce::services::events::EventPublisher;
use storefront_commerce::state::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let db = Database::connect(&config.database).await.context("failed to connect to database")?;
    sqlx::migrate!("./migrations").run(db.pool()).await.context("failed to run migrations")?;

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => {
                tracing::info!(%url, "Connected to NATS");
                Some(client)
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "NATS unavailable, events will only be logged");
                None
            }
        },
        None => None,
    };

    let addr = config.socket_addr();
    let bootstrap_admin = config.bootstrap_admin.clone();
    let state = AppState::new(config, db, EventPublisher::new(nats)).context("failed to configure SMTP")?;

    if let Some((email, password)) = bootstrap_admin {
        AuthService::new(&state.db, &state.tokens, state.mailer.as_ref())
            .bootstrap_admin(&email, &password)
            .await
            .context("failed to bootstrap admin account")?;
    }

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Storefront commerce listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
