//! Mail-sending abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleMailer;
pub use smtp::{SmtpConfig, SmtpMailer};

/// Trait for delivering one-time codes
pub trait Mailer: Send + Sync {
    /// Send a registration code to an email address
    fn send_otp(&self, email: &str, name: &str, code: &str) -> Result<(), String>;
}

/// Allow using Box<dyn Mailer> as a Mailer
impl Mailer for Box<dyn Mailer> {
    fn send_otp(&self, email: &str, name: &str, code: &str) -> Result<(), String> {
        (**self).send_otp(email, name, code)
    }
}
