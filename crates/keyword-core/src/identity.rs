//! Identity Provider Strategy
//!
//! Identity Records live in the external identity provider. The gateway
//! reads them, and writes only the application metadata bag through
//! partial updates ([`MetadataPatch`]). The provider serializes concurrent
//! writers; nothing here assumes read-modify-write atomicity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Profile of the signed-in user, as resolved from their identity token
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable subject identifier (e.g., `auth0|64f...`)
    pub sub: String,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,
}

/// Application metadata bag stored on each Identity Record
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetadata {
    /// Cached Billing Customer id; at most one per record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,

    /// Entitlement flag
    #[serde(default)]
    pub is_premium: bool,

    /// Metered free-tier extractions
    #[serde(default)]
    pub free_usage_count: u32,

    /// Keys written by other applications, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserMetadata {
    /// Cached billing-customer id, ignoring empty strings
    pub fn customer_id(&self) -> Option<&str> {
        self.stripe_customer_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Apply a patch the way the identity provider merges it
    pub fn apply(&mut self, patch: &MetadataPatch) {
        if let Some(ref id) = patch.stripe_customer_id {
            self.stripe_customer_id = Some(id.clone());
        }
        if let Some(premium) = patch.is_premium {
            self.is_premium = premium;
        }
        if let Some(count) = patch.free_usage_count {
            self.free_usage_count = count;
        }
    }
}

/// An Identity Record: subject, profile fields and metadata bag
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub metadata: UserMetadata,
}

impl IdentityRecord {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.metadata.stripe_customer_id = Some(customer_id.into());
        self
    }

    pub const fn premium(mut self) -> Self {
        self.metadata.is_premium = true;
        self
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            sub: self.subject.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// Partial metadata update; absent fields are left as they are
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_usage_count: Option<u32>,
}

impl MetadataPatch {
    pub fn customer_id(id: impl Into<String>) -> Self {
        Self {
            stripe_customer_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn premium(value: bool) -> Self {
        Self {
            is_premium: Some(value),
            ..Default::default()
        }
    }

    pub fn usage(count: u32) -> Self {
        Self {
            free_usage_count: Some(count),
            ..Default::default()
        }
    }
}

/// Strategy trait for identity providers
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve the user behind an access/identity token
    async fn user_from_token(&self, token: &str) -> Result<UserProfile>;

    /// Fetch one Identity Record by subject
    async fn get_record(&self, subject: &str) -> Result<IdentityRecord>;

    /// Merge `patch` into the record's metadata bag
    async fn update_metadata(&self, subject: &str, patch: &MetadataPatch) -> Result<()>;

    /// All records whose cached billing-customer id equals `customer_id`
    async fn find_by_customer_id(&self, customer_id: &str) -> Result<Vec<IdentityRecord>>;

    /// Vendor name, for logs
    fn name(&self) -> &str;
}
