//! Billing Provider Strategy
//!
//! Billing Customers and Checkout Sessions are owned by the payments vendor.
//! [`BillingProvider`] is the gateway's only view of that vendor.

use async_trait::async_trait;
use keyword_core::UserProfile;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which purchase button started the checkout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutMode {
    /// One-time payment
    Payment,
    /// Recurring subscription
    Subscription,
}

impl CheckoutMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Subscription => "subscription",
        }
    }

    /// Fixed product and price for this mode
    pub fn pricing(self) -> PlanPricing {
        match self {
            Self::Payment => PlanPricing {
                name: "Premium Access".into(),
                description: "Unlimited keyword extraction".into(),
                cents: 999, // $9.99 once
                interval: None,
            },
            Self::Subscription => PlanPricing {
                name: "Premium Subscription".into(),
                description: "Unlimited keyword extraction, billed monthly".into(),
                cents: 5000, // $50/month
                interval: Some(BillingInterval::Monthly),
            },
        }
    }
}

/// Billing interval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

/// Pricing information
#[derive(Clone, Debug)]
pub struct PlanPricing {
    pub name: String,
    pub description: String,
    pub cents: i64,
    /// `None` for one-time payments
    pub interval: Option<BillingInterval>,
}

/// Request to create a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Resolved Billing Customer id
    pub customer_id: String,

    pub mode: CheckoutMode,

    /// URL to redirect after successful payment
    pub success_url: String,

    /// URL to redirect if checkout is cancelled
    pub cancel_url: String,

    /// Identity subject, for tracking
    #[serde(default)]
    pub user_id: Option<String>,
}

impl CheckoutRequest {
    /// Build a request whose redirects point at the client's `/success` and `/cancel` routes
    pub fn for_frontend(
        customer_id: impl Into<String>,
        mode: CheckoutMode,
        frontend_url: &str,
    ) -> Self {
        let base = frontend_url.trim_end_matches('/');
        Self {
            customer_id: customer_id.into(),
            mode,
            success_url: format!(
                "{base}/success?mode={}&session_id={{CHECKOUT_SESSION_ID}}",
                mode.as_str()
            ),
            cancel_url: format!("{base}/cancel"),
            user_id: None,
        }
    }

    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Result of creating a checkout session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Vendor session id
    pub id: String,

    /// Hosted checkout page, when the vendor returns one
    pub url: Option<String>,

    pub mode: CheckoutMode,
}

/// Strategy trait for payment vendors
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// Create a Billing Customer and return its id
    async fn create_customer(&self, profile: &UserProfile) -> Result<String>;

    /// Create a single-line-item hosted checkout session
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession>;

    /// Create a payment intent for `amount` cents and return its client secret
    async fn create_payment_intent(&self, amount: i64) -> Result<String>;

    /// Whether the customer holds any active (or trialing) subscription
    async fn has_active_subscription(&self, customer_id: &str) -> Result<bool>;
}
