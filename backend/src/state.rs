use std::sync::Arc;

use adapters::{MailClient, PaymentGateway, StripeClient};

use crate::config::Config;
use crate::database::Db;

/// Shared application state threaded through every handler.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub payments: Arc<dyn PaymentGateway>,
    pub mailer: MailClient,
}

impl AppState {
    pub fn new(config: Config, db: Db) -> Self {
        let payments = Arc::new(StripeClient::new(config.stripe_secret_key.clone()));
        let mailer = MailClient::new(
            config.mail_endpoint.clone(),
            config.mail_api_key.clone(),
            config.mail_from.clone(),
        );
        Self {
            config,
            db,
            payments,
            mailer,
        }
    }
}
