//! Application State

use std::sync::Arc;

use keyword_core::{EntityExtractor, IdentityProvider};
use keyword_payments::{BillingProvider, StripeClient, WebhookVerifier};
use keyword_runtime::{Auth0IdentityProvider, GoogleNlpExtractor};

use crate::config::Config;
use crate::rate_limit::RateLimiter;

/// Shared application state
///
/// Each vendor capability is `None` when its credentials are missing.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Entity extraction (Google Natural Language, etc.)
    pub extractor: Option<Arc<dyn EntityExtractor>>,

    /// Billing customers, checkout and subscriptions (Stripe)
    pub billing: Option<Arc<dyn BillingProvider>>,

    /// Identity records and metadata (Auth0)
    pub identity: Option<Arc<dyn IdentityProvider>>,

    /// Webhook signature checks
    pub webhooks: Option<Arc<WebhookVerifier>>,

    /// Extraction rate limiter, shared by all requests
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// State with no vendors attached
    pub fn new(config: Config) -> Self {
        let limiter = Arc::new(RateLimiter::per_hour(config.rate_limit_per_hour));
        let webhooks = config
            .stripe_webhook_secret
            .as_ref()
            .map(|secret| Arc::new(WebhookVerifier::new(secret.clone())));

        Self {
            config: Arc::new(config),
            extractor: None,
            billing: None,
            identity: None,
            webhooks,
            limiter,
        }
    }

    /// Build the real vendor adapters for whatever `config` has credentials for
    pub fn from_config(config: Config) -> Self {
        let extractor = config.google.clone().and_then(|google| {
            GoogleNlpExtractor::from_config(google)
                .map(|e| Arc::new(e) as Arc<dyn EntityExtractor>)
                .map_err(|e| tracing::error!(error = %e, "Failed to build extraction client"))
                .ok()
        });

        let identity = config.auth0.clone().and_then(|auth0| {
            Auth0IdentityProvider::from_config(auth0)
                .map(|p| Arc::new(p) as Arc<dyn IdentityProvider>)
                .map_err(|e| tracing::error!(error = %e, "Failed to build identity client"))
                .ok()
        });

        let billing = config.stripe_secret_key.as_deref().map(|key| {
            Arc::new(StripeClient::new(key).with_timeout(config.vendor_timeout))
                as Arc<dyn BillingProvider>
        });

        let mut state = Self::new(config);
        state.extractor = extractor;
        state.identity = identity;
        state.billing = billing;
        state
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn EntityExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    #[must_use]
    pub fn with_billing(mut self, billing: Arc<dyn BillingProvider>) -> Self {
        self.billing = Some(billing);
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }
}
