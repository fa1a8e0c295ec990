//! Central module for application-wide configuration settings.
//!
//! Everything is read from the environment once at startup. Required
//! secrets (JWT keys, payment credentials) abort the boot when missing;
//! the rest fall back to development defaults.

use std::{env, fmt::Display, str::FromStr};

use tracing::info;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub mongo_uri: String,
    pub mongo_db: String,

    pub jwt_access_secret: String,
    pub jwt_refresh_secret: String,

    /// Frontend origin, used for CORS and checkout redirect URLs.
    pub client_url: String,

    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,

    pub mail_endpoint: String,
    pub mail_api_key: String,
    pub mail_from: String,
    /// Recipient for contact-form notifications.
    pub contact_email: String,

    /// Optional admin seeding, gated on INIT_ADMIN=true.
    pub init_admin: bool,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", "5000"),
            mongo_uri: try_load("MONGO_URI", "mongodb://localhost:27017"),
            mongo_db: try_load("MONGO_DB", "murshid"),

            jwt_access_secret: require("JWT_ACCESS_SECRET"),
            jwt_refresh_secret: require("JWT_REFRESH_SECRET"),

            client_url: try_load("CLIENT_URL", "http://localhost:5173"),

            stripe_secret_key: require("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: require("STRIPE_WEBHOOK_SECRET"),

            mail_endpoint: require("MAIL_ENDPOINT"),
            mail_api_key: require("MAIL_API_KEY"),
            mail_from: try_load("MAIL_FROM", "no-reply@murshid.app"),
            contact_email: try_load("CONTACT_EMAIL", "support@murshid.app"),

            init_admin: try_load("INIT_ADMIN", "false"),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }
}

fn require(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} is not defined in environment variables"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .unwrap_or_else(|e| panic!("Invalid {key} value: {e}"))
}
