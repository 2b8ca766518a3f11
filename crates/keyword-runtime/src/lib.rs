//! # keyword-runtime
//!
//! Vendor adapters for the keyword gateway.
//!
//! ## Providers
//!
//! - **Google Natural Language** (default): entity extraction
//! - **Auth0** (default): identity records and metadata via the Management API
//!
//! Every adapter owns a `reqwest::Client` built with a bounded timeout.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keyword_runtime::google::{GoogleNlpConfig, GoogleNlpExtractor};
//!
//! let extractor = GoogleNlpExtractor::from_config(GoogleNlpConfig::new(api_key))?;
//! let keywords = keyword_core::extract_keywords(&extractor, text).await?;
//! ```

mod http;

#[cfg(feature = "google")]
pub mod google;

#[cfg(feature = "auth0")]
pub mod auth0;

#[cfg(feature = "google")]
pub use google::{GoogleNlpConfig, GoogleNlpExtractor};

#[cfg(feature = "auth0")]
pub use auth0::{Auth0Config, Auth0IdentityProvider};

// Re-export core types for convenience
pub use keyword_core::{
    EntityExtractor, IdentityProvider, IdentityRecord, MetadataPatch, Result, UserMetadata,
    UserProfile, VendorError,
};
