//! # keyword-payments
//!
//! Billing customers, checkout, webhook reconciliation and entitlement for
//! the keyword gateway.
//!
//! ## Purchase flow (Stripe Checkout, hosted)
//!
//! ```text
//! ┌─────────────┐  resolve   ┌─────────────────┐  redirect  ┌─────────────────┐
//! │   Client    │──────────▶│     Gateway     │──────────▶│  Stripe Hosted  │
//! │  (pricing)  │  customer  │ (checkout sess.) │            │  Checkout Page  │
//! └─────────────┘            └─────────────────┘            └────────┬────────┘
//!                                     ▲                              │
//!                                     │  checkout.session.completed  │
//!                                     └──────────── webhook ─────────┘
//! ```
//!
//! 1. [`CustomerResolver`] reuses the Billing Customer id cached on the
//!    Identity Record, or creates one and caches it.
//! 2. [`BillingProvider::create_checkout_session`] starts a one-time or
//!    subscription checkout.
//! 3. Stripe calls the webhook; [`WebhookVerifier`] checks the signature
//!    over the raw body with `stripe::Webhook` and [`WebhookReconciler`] sets `isPremium` on every
//!    record caching that customer id.
//! 4. [`FeatureGate`] answers entitlement from the cached flag, or from
//!    Stripe directly when asked to verify.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keyword_payments::{CheckoutMode, CheckoutRequest, CustomerResolver, StripeClient};
//!
//! let billing = Arc::new(StripeClient::new("sk_test_xxx"));
//! let customer = CustomerResolver::new(billing.clone(), Some(identity))
//!     .resolve(&profile, cached_id)
//!     .await?;
//!
//! let session = billing
//!     .create_checkout_session(&CheckoutRequest::for_frontend(customer.id, CheckoutMode::Payment, frontend_url))
//!     .await?;
//! ```
#![recursion_limit = "256"]

mod billing;
mod checkout;
mod customer;
mod error;
mod gate;
pub mod mock;
mod usage;
mod webhook;

pub use billing::{
    BillingInterval, BillingProvider, CheckoutMode, CheckoutRequest, CheckoutSession, PlanPricing,
};
pub use checkout::StripeClient;
pub use customer::{CustomerResolver, ResolvedCustomer};
pub use error::{PaymentError, Result};
pub use gate::{FeatureGate, is_entitled};
pub use usage::{DEFAULT_FREE_LIMIT, UsageDecision, UsageMeter};
pub use webhook::{
    ReconcileOutcome, SIGNATURE_HEADER, WebhookEvent, WebhookReconciler, WebhookVerifier,
};
