//! Console-based mailer for development

use super::Mailer;

/// Mailer that logs codes to the console (for development)
pub struct ConsoleMailer;

impl ConsoleMailer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailer for ConsoleMailer {
    fn send_otp(&self, email: &str, _name: &str, code: &str) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  REGISTRATION CODE FOR: {}", email);
        println!("  CODE: {}", code);
        println!("========================================");
        println!();

        tracing::info!(email = %email, code = %code, "Registration code sent");

        Ok(())
    }
}
