//! Feature Gate
//!
//! Two ways to answer "is this user entitled?":
//!
//! - the cached flag in the Identity Record's metadata, cheap enough for
//!   every page load
//! - a direct subscription query against the payments vendor, for
//!   on-demand verification
//!
//! They may disagree until a webhook or a verification catches up.

use std::sync::Arc;

use keyword_core::{IdentityProvider, MetadataPatch, UserMetadata};

use crate::billing::BillingProvider;
use crate::error::{PaymentError, Result};

/// Cached entitlement check
pub const fn is_entitled(metadata: &UserMetadata) -> bool {
    metadata.is_premium
}

pub struct FeatureGate {
    billing: Arc<dyn BillingProvider>,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl FeatureGate {
    pub fn new(billing: Arc<dyn BillingProvider>) -> Self {
        Self {
            billing,
            identity: None,
        }
    }

    #[must_use]
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Authoritative check: does the customer hold an active subscription?
    pub async fn subscription_active(&self, customer_id: &str) -> Result<bool> {
        self.billing.has_active_subscription(customer_id).await
    }

    /// "Verify now": query the vendor for `subject`'s cached customer and
    /// promote the cached flag when a subscription is active.
    ///
    /// The flag is never cleared here, since one-time payments grant
    /// entitlement without any subscription.
    pub async fn verify_now(&self, subject: &str) -> Result<bool> {
        let identity = self
            .identity
            .as_ref()
            .ok_or_else(|| PaymentError::Config("identity provider not configured".into()))?;

        let record = identity.get_record(subject).await?;
        let cached = is_entitled(&record.metadata);

        let Some(customer_id) = record.metadata.customer_id() else {
            return Ok(cached);
        };

        let active = self.subscription_active(customer_id).await?;
        if active && !cached {
            identity
                .update_metadata(subject, &MetadataPatch::premium(true))
                .await?;
            tracing::info!(
                user_id = %subject,
                customer_id = %customer_id,
                "Promoted entitlement flag after subscription check"
            );
        }

        Ok(cached || active)
    }
}
