//! In-memory billing fake and webhook fixtures
//!
//! For testing and local development. Ids look like Stripe's so they pass
//! the same validation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use keyword_core::UserProfile;
use serde_json::json;
use sha2::Sha256;

use crate::billing::{BillingProvider, CheckoutRequest, CheckoutSession};
use crate::error::{PaymentError, Result};

#[derive(Default)]
pub struct MemoryBillingProvider {
    customers: Mutex<Vec<UserProfile>>,
    sessions: Mutex<Vec<CheckoutRequest>>,
    active: Mutex<HashSet<String>>,
    intents: AtomicUsize,
    fail: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose every call fails like an unreachable vendor
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_active_subscription(self, customer_id: impl Into<String>) -> Self {
        lock(&self.active).insert(customer_id.into());
        self
    }

    /// Number of Billing Customers created so far
    pub fn created_customers(&self) -> usize {
        lock(&self.customers).len()
    }

    /// Checkout requests received so far
    pub fn sessions(&self) -> Vec<CheckoutRequest> {
        lock(&self.sessions).clone()
    }

    fn check(&self) -> Result<()> {
        if self.fail {
            return Err(PaymentError::Stripe("mock billing offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BillingProvider for MemoryBillingProvider {
    async fn create_customer(&self, profile: &UserProfile) -> Result<String> {
        self.check()?;
        let mut customers = lock(&self.customers);
        customers.push(profile.clone());
        Ok(format!("cus_mem{}", customers.len()))
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        self.check()?;
        let mut sessions = lock(&self.sessions);
        sessions.push(request.clone());
        let id = format!("cs_test_mem{}", sessions.len());
        Ok(CheckoutSession {
            url: Some(format!("https://checkout.stripe.test/c/pay/{id}")),
            id,
            mode: request.mode,
        })
    }

    async fn create_payment_intent(&self, amount: i64) -> Result<String> {
        self.check()?;
        let n = self.intents.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("pi_mem{n}_secret_{amount}"))
    }

    async fn has_active_subscription(&self, customer_id: &str) -> Result<bool> {
        self.check()?;
        Ok(lock(&self.active).contains(customer_id))
    }
}

/// `stripe-signature` header for `payload` signed with `secret` at `timestamp`
pub fn sign_payload_at(secret: &str, timestamp: i64, payload: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::Config(format!("webhook secret: {e}")))?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(format!("t={timestamp},v1={signature}"))
}

/// `stripe-signature` header for `payload` signed now
pub fn sign_payload(secret: &str, payload: &str) -> Result<String> {
    sign_payload_at(secret, chrono::Utc::now().timestamp(), payload)
}

/// Event body of type `event_type` around a completed payment-mode
/// checkout session (`cs_test_1`) for `customer_id`
pub fn checkout_session_event(event_type: &str, customer_id: Option<&str>) -> String {
    json!({
        "id": "evt_test_1",
        "object": "event",
        "api_version": null,
        "created": 1_700_000_000,
        "livemode": false,
        "pending_webhooks": 1,
        "request": null,
        "type": event_type,
        "data": {
            "object": {
                "id": "cs_test_1",
                "object": "checkout.session",
                "after_expiration": null,
                "allow_promotion_codes": null,
                "amount_subtotal": 999,
                "amount_total": 999,
                "automatic_tax": { "enabled": false, "status": null },
                "billing_address_collection": null,
                "cancel_url": "http://localhost:4200/cancel",
                "client_reference_id": null,
                "consent": null,
                "consent_collection": null,
                "created": 1_700_000_000,
                "currency": "usd",
                "custom_fields": [],
                "custom_text": {
                    "shipping_address": null,
                    "submit": null,
                    "terms_of_service_acceptance": null
                },
                "customer": customer_id,
                "customer_creation": null,
                "customer_details": null,
                "customer_email": null,
                "expires_at": 1_700_086_400,
                "invoice": null,
                "invoice_creation": null,
                "livemode": false,
                "locale": null,
                "metadata": { "mode": "payment" },
                "mode": "payment",
                "payment_intent": null,
                "payment_link": null,
                "payment_method_collection": null,
                "payment_method_options": null,
                "payment_method_types": ["card"],
                "payment_status": "paid",
                "phone_number_collection": { "enabled": false },
                "recovered_from": null,
                "setup_intent": null,
                "shipping_address_collection": null,
                "shipping_cost": null,
                "shipping_details": null,
                "shipping_options": [],
                "status": "complete",
                "submit_type": null,
                "subscription": null,
                "success_url": "http://localhost:4200/success?mode=payment&session_id=cs_test_1",
                "total_details": { "amount_discount": 0, "amount_shipping": 0, "amount_tax": 0 },
                "url": null
            }
        }
    })
    .to_string()
}
