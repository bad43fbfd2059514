//! Console-based gateway for development

use super::{Charge, PaymentGateway};

/// Gateway that fabricates a local reference and logs the charge
/// (for development)
pub struct ConsoleGateway;

impl ConsoleGateway {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentGateway for ConsoleGateway {
    fn create_charge(&self, amount_minor: i64, receipt: &str) -> Result<Charge, String> {
        let reference = format!("local_{}", receipt);

        tracing::info!(
            reference = %reference,
            amount_minor,
            "Charge created (console gateway)"
        );

        Ok(Charge {
            reference,
            amount_minor,
            currency: "INR".to_string(),
        })
    }
}
