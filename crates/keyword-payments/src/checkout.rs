//! Stripe Integration
//!
//! `BillingProvider` backed by the Stripe API, using the "Stripe Checkout
//! (Hosted)" approach for purchases.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use keyword_core::UserProfile;
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionLineItemsPriceDataRecurring,
    CreateCheckoutSessionLineItemsPriceDataRecurringInterval, CreateCustomer,
    CreatePaymentIntent, Currency, Customer, CustomerId, ListSubscriptions, PaymentIntent,
    StripeError, Subscription, SubscriptionStatus,
};

use crate::billing::{
    BillingInterval, BillingProvider, CheckoutMode, CheckoutRequest, CheckoutSession,
};
use crate::error::{PaymentError, Result};

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    timeout: Duration,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
            timeout: Duration::from_secs(10),
        }
    }

    /// Bound every Stripe call by `timeout`
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn call<T, F>(&self, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, StripeError>>,
    {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| PaymentError::Timeout(self.timeout))?
            .map_err(|e| PaymentError::Stripe(e.to_string()))
    }
}

fn parse_customer_id(id: &str) -> Result<CustomerId> {
    id.parse::<CustomerId>()
        .map_err(|_| PaymentError::InvalidCustomer(id.to_string()))
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn create_customer(&self, profile: &UserProfile) -> Result<String> {
        let mut params = CreateCustomer::new();
        params.email = profile.email.as_deref();
        params.name = profile.name.as_deref();

        if !profile.sub.is_empty() {
            let mut metadata = HashMap::new();
            metadata.insert("user_id".to_string(), profile.sub.clone());
            params.metadata = Some(metadata);
        }

        let customer = self.call(Customer::create(&self.client, params)).await?;

        tracing::info!(
            customer_id = %customer.id,
            user_id = %profile.sub,
            "Created Stripe customer"
        );

        Ok(customer.id.to_string())
    }

    async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let pricing = request.mode.pricing();

        let mut params = CreateCheckoutSession::new();
        params.customer = Some(parse_customer_id(&request.customer_id)?);
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.client_reference_id = request.user_id.as_deref();
        params.mode = Some(match request.mode {
            CheckoutMode::Payment => CheckoutSessionMode::Payment,
            CheckoutMode::Subscription => CheckoutSessionMode::Subscription,
        });

        // Add metadata for tracking
        let mut metadata = HashMap::new();
        metadata.insert("mode".to_string(), request.mode.as_str().to_string());
        if let Some(ref user_id) = request.user_id {
            metadata.insert("user_id".to_string(), user_id.clone());
        }
        params.metadata = Some(metadata);

        // Line items
        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Currency::USD,
                unit_amount: Some(pricing.cents),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: pricing.name.clone(),
                    description: Some(pricing.description.clone()),
                    ..Default::default()
                }),
                recurring: pricing.interval.map(|interval| {
                    CreateCheckoutSessionLineItemsPriceDataRecurring {
                        interval: match interval {
                            BillingInterval::Monthly => {
                                CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Month
                            }
                            BillingInterval::Yearly => {
                                CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Year
                            }
                        },
                        interval_count: Some(1),
                    }
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = self
            .call(StripeCheckoutSession::create(&self.client, params))
            .await?;

        tracing::info!(
            session_id = %session.id,
            customer_id = %request.customer_id,
            mode = request.mode.as_str(),
            "Created Stripe checkout session"
        );

        Ok(CheckoutSession {
            id: session.id.to_string(),
            url: session.url,
            mode: request.mode,
        })
    }

    async fn create_payment_intent(&self, amount: i64) -> Result<String> {
        let params = CreatePaymentIntent::new(amount, Currency::USD);
        let intent = self.call(PaymentIntent::create(&self.client, params)).await?;

        intent
            .client_secret
            .ok_or_else(|| PaymentError::Stripe("No client secret returned".into()))
    }

    async fn has_active_subscription(&self, customer_id: &str) -> Result<bool> {
        let mut params = ListSubscriptions::new();
        params.customer = Some(parse_customer_id(customer_id)?);

        let subscriptions = self.call(Subscription::list(&self.client, &params)).await?;

        Ok(subscriptions
            .data
            .iter()
            .any(|s| matches!(s.status, SubscriptionStatus::Active | SubscriptionStatus::Trialing)))
    }
}
