//! # keyword-core
//!
//! Vendor-neutral abstractions for the keyword gateway.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Gateway                              │
//! │  ┌──────────────────┐  ┌──────────────────┐  ┌─────────────┐  │
//! │  │ EntityExtractor  │  │ IdentityProvider │  │   Billing   │  │
//! │  │   (Strategy)     │  │   (Strategy)     │  │ (payments)  │  │
//! │  └──────────────────┘  └──────────────────┘  └─────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each vendor sits behind a trait with one real implementation (see
//! `keyword-runtime`) and one in-memory fake in [`mock`], so handlers never
//! import a vendor client directly.

pub mod error;
pub mod extractor;
pub mod identity;
pub mod mock;

pub use error::{Result, VendorError};
pub use extractor::{
    Entity, EntityExtractor, Keyword, SALIENCE_THRESHOLD, extract_keywords, is_blank, select_keywords,
};
pub use identity::{IdentityProvider, IdentityRecord, MetadataPatch, UserMetadata, UserProfile};
