//! Application state

use crate::auth::TokenKeys;
use crate::email::Mailer;
use crate::numbering::{OrderNumbering, ZeroPaddedNumbering};
use crate::otp::OtpStore;
use crate::payment::PaymentGateway;
use crate::store::Datastore;

/// Shared state handed to every handler
pub struct AppState<D, M, G> {
    pub keys: TokenKeys,
    pub store: D,
    pub otp: Box<dyn OtpStore>,
    pub mailer: M,
    pub gateway: G,
    pub numbering: Box<dyn OrderNumbering>,
}

impl<D, M, G> AppState<D, M, G>
where
    D: Datastore,
    M: Mailer,
    G: PaymentGateway,
{
    pub fn new(keys: TokenKeys, store: D, otp: Box<dyn OtpStore>, mailer: M, gateway: G) -> Self {
        Self {
            keys,
            store,
            otp,
            mailer,
            gateway,
            numbering: Box::new(ZeroPaddedNumbering),
        }
    }
}
