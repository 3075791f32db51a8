//! Shared handler state.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::Database;
use crate::services::auth::TokenService;
use crate::services::email::{LogMailer, Mailer, SmtpMailer};
use crate::services::events::EventPublisher;
use crate::services::images::{CloudinaryClient, DisabledImageStore, ImageStore};
use crate::services::payments::{koko::Koko, payhere::PayHere};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
    pub images: Arc<dyn ImageStore>,
    pub events: EventPublisher,
    pub payhere: Option<PayHere>,
    pub koko: Option<Koko>,
}

impl AppState {
    /// Wire collaborators from configuration. Missing SMTP or Cloudinary
    /// settings fall back to a logging mailer and a disabled image store.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay host is invalid.
    pub fn new(config: AppConfig, db: Database, events: EventPublisher) -> Result<Self, lettre::transport::smtp::Error> {
        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
            None => {
                tracing::warn!("SMTP not configured, emails will only be logged");
                Arc::new(LogMailer)
            }
        };
        let images: Arc<dyn ImageStore> = match &config.cloudinary {
            Some(cloudinary) => Arc::new(CloudinaryClient::new(cloudinary)),
            None => Arc::new(DisabledImageStore),
        };
        Ok(Self {
            tokens: TokenService::new(&config.auth),
            payhere: config.payhere.clone().map(PayHere::new),
            koko: config.koko.clone().map(Koko::new),
            config: Arc::new(config),
            db,
            mailer,
            images,
            events,
        })
    }
}
