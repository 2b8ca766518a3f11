//! Payment Error Types

use std::time::Duration;

use keyword_core::VendorError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Stripe call exceeded the configured bound
    #[error("Stripe timed out after {0:?}")]
    Timeout(Duration),

    /// Not a usable Stripe customer id
    #[error("Invalid customer id: {0}")]
    InvalidCustomer(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identity provider error
    #[error("Identity provider error: {0}")]
    Identity(#[from] VendorError),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Stripe(_) | Self::Timeout(_) => true,
            Self::Identity(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::Stripe(_) | Self::Timeout(_) => "Payment processing failed. Please try again.",
            Self::InvalidCustomer(_) => "Unknown billing customer.",
            Self::WebhookSignature(_) | Self::WebhookParse(_) => "Invalid webhook payload.",
            Self::Config(_) => "Service configuration error.",
            Self::Identity(_) => "Account service is unavailable. Please try again.",
        }
    }
}
