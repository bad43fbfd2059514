//! Server configuration

use crate::email::SmtpConfig;
use crate::payment::GatewayConfig;

#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// Path of the SQLite database file
    pub database_path: String,

    /// Signing secret for customer tokens
    pub customer_token_secret: String,

    /// Signing secret for staff tokens
    pub staff_token_secret: String,

    /// SMTP configuration; codes are logged to the console when unset
    pub smtp: Option<SmtpConfig>,

    /// Payment gateway configuration; charges get local references when
    /// unset
    pub gateway: Option<GatewayConfig>,

    /// Out-of-band seed for the first staff account
    pub seed_admin: Option<SeedAdmin>,
}

#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Config {
    /// Load configuration from the environment
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);

        let database_path =
            std::env::var("DATABASE_PATH").unwrap_or_else(|_| "kitchen.db".to_string());

        let customer_token_secret =
            std::env::var("JWT_SECRET").unwrap_or_else(|_| "secret".to_string());
        let staff_token_secret =
            std::env::var("ADMIN_JWT_SECRET").unwrap_or_else(|_| "adminsecret".to_string());

        let seed_admin = match (
            std::env::var("ADMIN_USERNAME").ok().filter(|s| !s.is_empty()),
            std::env::var("ADMIN_EMAIL").ok().filter(|s| !s.is_empty()),
            std::env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
        ) {
            (Some(username), Some(email), Some(password)) => Some(SeedAdmin {
                username,
                email,
                password,
            }),
            _ => None,
        };

        Self {
            port,
            database_path,
            customer_token_secret,
            staff_token_secret,
            smtp: SmtpConfig::from_env(),
            gateway: GatewayConfig::from_env(),
            seed_admin,
        }
    }
}
