//! Stripe Webhook Handling
//!
//! Verifies signed webhook deliveries and reconciles completed checkouts
//! into the identity provider's entitlement flag.
//!
//! Deliveries are at-least-once. Reconciliation only ever sets the flag to
//! `true`, so a redelivered event changes nothing.

use std::sync::Arc;

use keyword_core::{IdentityProvider, MetadataPatch};
use stripe::{Event, EventObject, EventType, Webhook, WebhookError};

use crate::error::{PaymentError, Result};

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Verifies `stripe-signature` headers against the endpoint secret
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify signature and timestamp over the raw body, then parse the event.
    ///
    /// A body that is correctly signed but does not parse comes back as
    /// [`PaymentError::WebhookParse`]; every other failure is
    /// [`PaymentError::WebhookSignature`].
    pub fn verify(&self, payload: &str, signature: &str) -> Result<Event> {
        Webhook::construct_event(payload, signature, &self.secret).map_err(|e| match e {
            WebhookError::BadParse(e) => PaymentError::WebhookParse(e.to_string()),
            e => PaymentError::WebhookSignature(e.to_string()),
        })
    }
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Checkout completed - grant entitlement
    CheckoutCompleted {
        session_id: String,
        customer_id: Option<String>,
    },

    /// Unhandled event type
    Other { event_type: String },
}

impl From<&Event> for WebhookEvent {
    fn from(event: &Event) -> Self {
        match (&event.type_, &event.data.object) {
            (EventType::CheckoutSessionCompleted, EventObject::CheckoutSession(session)) => {
                Self::CheckoutCompleted {
                    session_id: session.id.to_string(),
                    customer_id: session
                        .customer
                        .as_ref()
                        .map(|customer| customer.id().to_string())
                        .filter(|id| !id.is_empty()),
                }
            }
            _ => Self::Other {
                event_type: format!("{:?}", event.type_),
            },
        }
    }
}

/// What reconciliation did with one event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Matching records are now entitled; `updated` counts actual writes
    Entitled {
        customer_id: String,
        subjects: Vec<String>,
        updated: usize,
    },

    /// No Identity Record caches this customer id
    Unmatched { customer_id: String },

    /// Completed checkout without a customer
    MissingCustomer { session_id: String },

    /// Identity provider failed or is not configured. `subjects` lists the
    /// records that still got entitled.
    Failed {
        customer_id: String,
        subjects: Vec<String>,
        reason: String,
    },

    /// Event type acknowledged and ignored
    Ignored { event_type: String },
}

/// Maps verified events onto Identity Records
pub struct WebhookReconciler {
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl WebhookReconciler {
    pub fn new(identity: Option<Arc<dyn IdentityProvider>>) -> Self {
        Self { identity }
    }

    /// Process a verified event. Never fails: every outcome is acknowledged
    /// to the vendor, and problems are logged here.
    pub async fn handle(&self, event: &Event) -> ReconcileOutcome {
        tracing::info!(
            event_id = %event.id,
            event_type = ?event.type_,
            "Processing Stripe webhook"
        );

        match WebhookEvent::from(event) {
            WebhookEvent::CheckoutCompleted {
                session_id,
                customer_id: None,
            } => {
                tracing::warn!(
                    event_id = %event.id,
                    session_id = %session_id,
                    "Completed checkout carries no customer - nothing to reconcile"
                );
                ReconcileOutcome::MissingCustomer { session_id }
            }

            WebhookEvent::CheckoutCompleted {
                customer_id: Some(customer_id),
                ..
            } => self.entitle(&event.id.to_string(), customer_id).await,

            WebhookEvent::Other { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
                ReconcileOutcome::Ignored { event_type }
            }
        }
    }

    async fn entitle(&self, event_id: &str, customer_id: String) -> ReconcileOutcome {
        let Some(ref identity) = self.identity else {
            tracing::error!(
                event_id = %event_id,
                customer_id = %customer_id,
                "Identity provider not configured - cannot reconcile payment"
            );
            return ReconcileOutcome::Failed {
                customer_id,
                subjects: Vec::new(),
                reason: "identity provider not configured".into(),
            };
        };

        let records = match identity.find_by_customer_id(&customer_id).await {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event_id = %event_id,
                    customer_id = %customer_id,
                    "Identity lookup failed during reconciliation"
                );
                return ReconcileOutcome::Failed {
                    customer_id,
                    subjects: Vec::new(),
                    reason: e.to_string(),
                };
            }
        };

        if records.is_empty() {
            tracing::warn!(
                event_id = %event_id,
                customer_id = %customer_id,
                "No identity record matches paid customer"
            );
            return ReconcileOutcome::Unmatched { customer_id };
        }

        if records.len() > 1 {
            tracing::warn!(
                customer_id = %customer_id,
                matches = records.len(),
                "Several identity records share one billing customer"
            );
        }

        let mut subjects = Vec::with_capacity(records.len());
        let mut failures = Vec::new();
        let mut updated = 0;
        for record in records {
            if !record.metadata.is_premium {
                if let Err(e) = identity
                    .update_metadata(&record.subject, &MetadataPatch::premium(true))
                    .await
                {
                    tracing::error!(
                        error = %e,
                        customer_id = %customer_id,
                        user_id = %record.subject,
                        "Failed to set entitlement flag"
                    );
                    failures.push(format!("{}: {e}", record.subject));
                    continue;
                }
                updated += 1;
            }

            tracing::info!(
                customer_id = %customer_id,
                user_id = %record.subject,
                "Entitlement granted"
            );
            subjects.push(record.subject);
        }

        if !failures.is_empty() {
            return ReconcileOutcome::Failed {
                customer_id,
                subjects,
                reason: failures.join("; "),
            };
        }

        ReconcileOutcome::Entitled {
            customer_id,
            subjects,
            updated,
        }
    }
}
