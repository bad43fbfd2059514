//! Order-intake and fulfillment-tracking backend for a single-vendor
//! kitchen.
//!
//! The core is the order lifecycle and session-aggregation engine:
//! payment-method-routed order creation, admin-controlled live sessions,
//! dual-audience bearer authentication, and an OTP workflow gating
//! account creation.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod email;
pub mod error;
pub mod numbering;
pub mod otp;
pub mod payment;
pub mod routes;
pub mod state;
pub mod store;

pub use auth::{Principal, TokenKeys};
pub use config::Config;
pub use email::{ConsoleMailer, Mailer, SmtpConfig, SmtpMailer};
pub use error::ApiError;
pub use otp::{InMemoryOtpStore, OtpStore};
pub use payment::{ConsoleGateway, GatewayConfig, PaymentGateway, RestGateway};
pub use state::AppState;
pub use store::{MemoryStore, SqliteStore};
