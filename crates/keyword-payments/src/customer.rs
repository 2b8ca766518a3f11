//! Billing Customer Resolution
//!
//! An Identity Record owns at most one Billing Customer. The id is cached in
//! the record's metadata; a new customer is created only when that cache is
//! empty, and persisting the new id is best-effort.

use std::sync::Arc;

use keyword_core::{IdentityProvider, MetadataPatch, UserProfile};

use crate::billing::BillingProvider;
use crate::error::Result;

/// Outcome of [`CustomerResolver::resolve`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCustomer {
    /// Billing Customer id usable for checkout
    pub id: String,

    /// Whether a new Billing Customer was created
    pub created: bool,

    /// Whether a newly created id reached the Identity Record
    pub persisted: bool,
}

/// Reuses or creates the Billing Customer for a user
pub struct CustomerResolver {
    billing: Arc<dyn BillingProvider>,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl CustomerResolver {
    pub fn new(
        billing: Arc<dyn BillingProvider>,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self { billing, identity }
    }

    /// Return the cached id when present and non-empty; otherwise create a
    /// customer from `profile` and try to cache its id on the record.
    ///
    /// A failed cache write is logged and does not fail the call.
    pub async fn resolve(&self, profile: &UserProfile, cached: Option<&str>) -> Result<ResolvedCustomer> {
        if let Some(id) = cached.map(str::trim).filter(|id| !id.is_empty()) {
            tracing::debug!(customer_id = %id, user_id = %profile.sub, "Reusing cached billing customer");
            return Ok(ResolvedCustomer {
                id: id.to_string(),
                created: false,
                persisted: true,
            });
        }

        let id = self.billing.create_customer(profile).await?;
        let persisted = self.persist(profile, &id).await;

        Ok(ResolvedCustomer {
            id,
            created: true,
            persisted,
        })
    }

    async fn persist(&self, profile: &UserProfile, customer_id: &str) -> bool {
        let Some(ref identity) = self.identity else {
            tracing::warn!(
                customer_id = %customer_id,
                "Identity provider not configured - billing customer id not cached"
            );
            return false;
        };

        if profile.sub.is_empty() {
            tracing::warn!(customer_id = %customer_id, "No subject on profile - billing customer id not cached");
            return false;
        }

        match identity
            .update_metadata(&profile.sub, &MetadataPatch::customer_id(customer_id))
            .await
        {
            Ok(()) => {
                tracing::info!(customer_id = %customer_id, user_id = %profile.sub, "Cached billing customer id");
                true
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    customer_id = %customer_id,
                    user_id = %profile.sub,
                    "Failed to cache billing customer id; a new customer will be created next time"
                );
                false
            }
        }
    }
}
