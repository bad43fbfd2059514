//! HTTP payment gateway client

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use super::{Charge, PaymentGateway};

/// Configuration for the hosted gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the gateway's REST API
    pub base_url: String,
    /// API key id
    pub key_id: String,
    /// API key secret
    pub key_secret: String,
    /// ISO currency code for created charges
    pub currency: String,
}

impl GatewayConfig {
    /// Create config from environment variables
    ///
    /// Required:
    /// - PAYMENT_GATEWAY_URL
    /// - PAYMENT_GATEWAY_KEY_ID
    /// - PAYMENT_GATEWAY_KEY_SECRET
    ///
    /// Optional:
    /// - PAYMENT_GATEWAY_CURRENCY (default: INR)
    pub fn from_env() -> Option<Self> {
        fn get_env(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|s| !s.is_empty())
        }

        let base_url = get_env("PAYMENT_GATEWAY_URL")?;
        let key_id = get_env("PAYMENT_GATEWAY_KEY_ID")?;
        let key_secret = get_env("PAYMENT_GATEWAY_KEY_SECRET")?;
        let currency = get_env("PAYMENT_GATEWAY_CURRENCY").unwrap_or_else(|| "INR".to_string());

        Some(Self {
            base_url,
            key_id,
            key_secret,
            currency,
        })
    }
}

#[derive(Deserialize)]
struct CreateChargeResponse {
    id: String,
}

/// Gateway client speaking the hosted API over HTTP.
///
/// Uses a blocking client; call through `tokio::task::spawn_blocking`
/// from async handlers.
pub struct RestGateway {
    config: GatewayConfig,
}

impl RestGateway {
    pub fn new(config: GatewayConfig) -> Self {
        tracing::info!(base_url = %config.base_url, "Payment gateway configured");
        Self { config }
    }

    // Built per call so the client only ever lives on a blocking thread
    fn client() -> Result<Client, String> {
        Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))
    }
}

impl PaymentGateway for RestGateway {
    fn create_charge(&self, amount_minor: i64, receipt: &str) -> Result<Charge, String> {
        let url = format!("{}/orders", self.config.base_url.trim_end_matches('/'));

        let response = Self::client()?
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&json!({
                "amount": amount_minor,
                "currency": self.config.currency,
                "receipt": receipt,
            }))
            .send()
            .map_err(|e| format!("Gateway request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("Gateway returned status {}", response.status()));
        }

        let body: CreateChargeResponse = response
            .json()
            .map_err(|e| format!("Gateway returned invalid body: {}", e))?;

        tracing::info!(reference = %body.id, amount_minor, "Remote charge created");

        Ok(Charge {
            reference: body.id,
            amount_minor,
            currency: self.config.currency.clone(),
        })
    }
}
