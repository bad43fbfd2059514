//! Payment-gateway abstractions

pub mod console;
pub mod rest;

pub use console::ConsoleGateway;
pub use rest::{GatewayConfig, RestGateway};

/// A remote charge created at the gateway
#[derive(Debug, Clone)]
pub struct Charge {
    /// Gateway-assigned reference correlating the remote charge to the
    /// local order
    pub reference: String,
    pub amount_minor: i64,
    pub currency: String,
}

/// Trait for creating remote charges.
///
/// Implementations may block; callers in async context run them on the
/// blocking pool.
pub trait PaymentGateway: Send + Sync {
    /// Create a charge for an amount in minor currency units, tagged with
    /// the local order's receipt string
    fn create_charge(&self, amount_minor: i64, receipt: &str) -> Result<Charge, String>;
}

/// Allow using Box<dyn PaymentGateway> as a PaymentGateway
impl PaymentGateway for Box<dyn PaymentGateway> {
    fn create_charge(&self, amount_minor: i64, receipt: &str) -> Result<Charge, String> {
        (**self).create_charge(amount_minor, receipt)
    }
}

/// Convert a rupee amount to minor units (paise)
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
