pub mod stripe;
pub mod webhook;

use thiserror::Error;

pub use stripe::{CheckoutSession, StripeClient};
pub use webhook::{apply_event, verify_signature, PaymentEvent, WebhookEvent};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment provider not configured: {0} missing")]
    NotConfigured(&'static str),

    #[error("payment request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("payment provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid webhook signature: {0}")]
    InvalidSignature(&'static str),

    #[error("malformed webhook payload: {0}")]
    Malformed(#[from] serde_json::Error),
}
