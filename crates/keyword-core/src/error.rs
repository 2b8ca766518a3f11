//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for vendor-facing operations
pub type Result<T> = std::result::Result<T, VendorError>;

/// Errors raised by vendor adapters (extraction, identity)
#[derive(Error, Debug)]
pub enum VendorError {
    /// Vendor answered with an error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Vendor unreachable (network, DNS, TLS)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Outbound call exceeded the configured bound
    #[error("Provider timed out after {0:?}")]
    Timeout(Duration),

    /// Credential or user token rejected
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Response could not be understood
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Adapter is missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl VendorError {
    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_) | Self::Timeout(_))
    }

    /// Whether the caller's credential was the problem rather than the vendor
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}
