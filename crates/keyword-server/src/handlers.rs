//! HTTP Handlers

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use keyword_core::{IdentityRecord, Keyword, UserMetadata, UserProfile, is_blank};
use keyword_payments::{
    CheckoutMode, CheckoutRequest, CheckoutSession, CustomerResolver, FeatureGate, PaymentError,
    SIGNATURE_HEADER, UsageMeter, WebhookReconciler,
};
use serde::{Deserialize, Serialize};

use crate::auth::{bearer_token, record_for_token};
use crate::error::{ApiError, ApiJson, JsonOrForm};
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub extraction_configured: bool,
    pub stripe_configured: bool,
    pub identity_configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomerRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerResponse {
    pub customer_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,

    /// Identity token, read when `user` is absent (form posts carry no
    /// nested profile)
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumResponse {
    pub is_premium: bool,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Liveness check
pub async fn test_handler() -> &'static str {
    "I'm working!"
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        extraction_configured: state.extractor.is_some(),
        stripe_configured: state.billing.is_some(),
        identity_configured: state.identity.is_some(),
    })
}

/// Extract salient keywords from `text`.
///
/// Requests with a bearer token are metered against the caller's free tier;
/// anonymous ones are governed by the per-client limiter alone.
pub async fn extract_keywords(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(payload): ApiJson<ExtractRequest>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let text = payload.text.unwrap_or_default();
    if is_blank(&text) {
        return Err(ApiError::validation("Text input is required."));
    }

    let extractor = state
        .extractor
        .as_ref()
        .ok_or_else(|| ApiError::misconfigured("extraction service"))?;

    let metered = match bearer_token(&headers) {
        Some(token) => metered_record(&state, token).await?,
        None => None,
    };

    let keywords = keyword_core::extract_keywords(extractor.as_ref(), &text)
        .await
        .map_err(|e| ApiError::upstream("Failed to extract keywords.", &e))?;

    if let Some((meter, record)) = metered {
        let decision = meter.check(&record);
        meter.record(&record, decision).await;
    }

    tracing::debug!(extractor = extractor.name(), count = keywords.len(), "Extracted keywords");

    Ok(Json(ExtractResponse {
        success: true,
        keywords,
    }))
}

/// Look up the caller's record and refuse when their free tier is spent.
async fn metered_record(
    state: &AppState,
    token: &str,
) -> Result<Option<(UsageMeter, IdentityRecord)>, ApiError> {
    let Some(identity) = state.identity.clone() else {
        tracing::warn!("Bearer token sent but identity provider not configured; skipping metering");
        return Ok(None);
    };

    let record = match record_for_token(state, token).await {
        Ok(record) => record,
        Err(e @ ApiError::Unauthorized(_)) => return Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "Usage lookup failed; serving request unmetered");
            return Ok(None);
        }
    };

    let meter = UsageMeter::new(identity, state.config.free_tier_limit);
    if !meter.check(&record).is_allowed() {
        tracing::info!(user_id = %record.subject, "Free tier exhausted");
        return Err(ApiError::FreeTierExhausted {
            limit: meter.free_limit(),
        });
    }

    Ok(Some((meter, record)))
}

pub async fn create_customer(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateCustomerRequest>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let email = payload
        .email
        .filter(|email| !is_blank(email))
        .ok_or_else(|| ApiError::validation("Email is required."))?;

    let billing = state
        .billing
        .as_ref()
        .ok_or_else(|| ApiError::misconfigured("payments"))?;

    let profile = UserProfile {
        sub: String::new(),
        email: Some(email),
        name: payload.name,
    };

    let customer_id = billing
        .create_customer(&profile)
        .await
        .map_err(|e| ApiError::payment("Failed to create customer in Stripe.", &e))?;

    tracing::info!(customer_id = %customer_id, "Created billing customer");
    Ok(Json(CustomerResponse { customer_id }))
}

/// One-time purchase: answers with the session for client-side redirect
pub async fn create_checkout_session(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CheckoutSessionRequest>,
) -> Result<Json<CheckoutSessionResponse>, ApiError> {
    let session = start_checkout(&state, payload, CheckoutMode::Payment).await?;
    Ok(Json(CheckoutSessionResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// Subscription purchase: redirects straight to the hosted checkout page.
///
/// Accepts a plain form post so the browser follows the redirect itself.
pub async fn create_subscription_session(
    State(state): State<AppState>,
    JsonOrForm(payload): JsonOrForm<CheckoutSessionRequest>,
) -> Result<Redirect, ApiError> {
    let session = start_checkout(&state, payload, CheckoutMode::Subscription).await?;
    let url = session.url.ok_or_else(|| {
        ApiError::upstream("Internal Server Error", &"checkout session returned without a URL")
    })?;
    Ok(Redirect::to(&url))
}

async fn start_checkout(
    state: &AppState,
    payload: CheckoutSessionRequest,
    mode: CheckoutMode,
) -> Result<CheckoutSession, ApiError> {
    let billing = state
        .billing
        .clone()
        .ok_or_else(|| ApiError::misconfigured("payments"))?;

    let profile = checkout_profile(state, payload.user, payload.token).await?;
    let requested = payload
        .customer_id
        .filter(|id| !is_blank(id));

    if profile.sub.is_empty() && profile.email.is_none() && requested.is_none() {
        return Err(ApiError::validation("A customer id or user profile is required."));
    }

    let cached = cached_customer_id(state, &profile).await.or(requested);

    let customer = CustomerResolver::new(billing.clone(), state.identity.clone())
        .resolve(&profile, cached.as_deref())
        .await
        .map_err(|e| ApiError::payment("Internal Server Error", &e))?;

    let mut request = CheckoutRequest::for_frontend(customer.id, mode, &state.config.frontend_url);
    if !profile.sub.is_empty() {
        request = request.with_user_id(profile.sub.clone());
    }

    let session = billing
        .create_checkout_session(&request)
        .await
        .map_err(|e| ApiError::payment("Internal Server Error", &e))?;

    tracing::info!(
        session_id = %session.id,
        customer_id = %request.customer_id,
        mode = mode.as_str(),
        created_customer = customer.created,
        "Created checkout session"
    );
    Ok(session)
}

/// Buyer's profile: as sent, else read from the identity token
async fn checkout_profile(
    state: &AppState,
    user: Option<UserProfile>,
    token: Option<String>,
) -> Result<UserProfile, ApiError> {
    if let Some(user) = user {
        return Ok(user);
    }
    let Some(token) = token.filter(|token| !is_blank(token)) else {
        return Ok(UserProfile::default());
    };

    let identity = state
        .identity
        .as_ref()
        .ok_or_else(|| ApiError::misconfigured("identity provider"))?;
    identity
        .user_from_token(&token)
        .await
        .map_err(|e| ApiError::identity("Failed to verify user.", &e))
}

/// Cached customer id from the caller's Identity Record. `None` when the
/// record cannot be read, in which case the request's id is used instead.
async fn cached_customer_id(state: &AppState, profile: &UserProfile) -> Option<String> {
    let identity = state.identity.as_ref()?;
    if profile.sub.is_empty() {
        return None;
    }

    match identity.get_record(&profile.sub).await {
        Ok(record) => Some(record.metadata.customer_id().unwrap_or_default().to_string()),
        Err(e) => {
            tracing::warn!(error = %e, user_id = %profile.sub, "Could not read identity record for checkout");
            None
        }
    }
}

pub async fn create_payment_intent(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let amount = payload
        .amount
        .filter(|amount| *amount > 0)
        .ok_or_else(|| ApiError::validation("Amount must be a positive number of cents."))?;

    let billing = state
        .billing
        .as_ref()
        .ok_or_else(|| ApiError::misconfigured("payments"))?;

    let client_secret = billing
        .create_payment_intent(amount)
        .await
        .map_err(|e| ApiError::payment("Internal Server Error", &e))?;

    Ok(Json(PaymentIntentResponse { client_secret }))
}

pub async fn check_subscription(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Result<Json<PremiumResponse>, ApiError> {
    let billing = state
        .billing
        .clone()
        .ok_or_else(|| ApiError::misconfigured("payments"))?;

    let is_premium = FeatureGate::new(billing)
        .subscription_active(&customer_id)
        .await
        .map_err(|e| ApiError::payment("Internal Server Error", &e))?;

    Ok(Json(PremiumResponse { is_premium }))
}

/// Metadata bag of the token's owner
pub async fn user_metadata(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TokenRequest>,
) -> Result<Json<UserMetadata>, ApiError> {
    let token = required_token(payload)?;
    let record = record_for_token(&state, &token).await?;
    Ok(Json(record.metadata))
}

/// Ask the payments vendor now, promoting the cached flag on success
pub async fn verify_subscription(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TokenRequest>,
) -> Result<Json<PremiumResponse>, ApiError> {
    let token = required_token(payload)?;

    let billing = state
        .billing
        .clone()
        .ok_or_else(|| ApiError::misconfigured("payments"))?;
    let identity = state
        .identity
        .clone()
        .ok_or_else(|| ApiError::misconfigured("identity provider"))?;

    let profile = identity
        .user_from_token(&token)
        .await
        .map_err(|e| ApiError::identity("Failed to verify user.", &e))?;

    let is_premium = FeatureGate::new(billing)
        .with_identity(identity)
        .verify_now(&profile.sub)
        .await
        .map_err(|e| ApiError::payment("Failed to verify subscription.", &e))?;

    Ok(Json(PremiumResponse { is_premium }))
}

fn required_token(payload: TokenRequest) -> Result<String, ApiError> {
    payload
        .token
        .filter(|token| !is_blank(token))
        .ok_or_else(|| ApiError::validation("Token is required."))
}

/// Stripe webhook. Takes the raw body: the signature covers the exact bytes.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let verifier = state
        .webhooks
        .as_ref()
        .ok_or_else(|| ApiError::misconfigured("webhook secret"))?;

    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        tracing::warn!("Webhook rejected: missing signature header");
        return Err(ApiError::InvalidSignature);
    };

    let Ok(payload) = std::str::from_utf8(&body) else {
        tracing::warn!("Webhook rejected: body is not UTF-8");
        return Err(ApiError::InvalidSignature);
    };

    let event = match verifier.verify(payload, signature) {
        Ok(event) => event,
        Err(PaymentError::WebhookParse(e)) => {
            // Genuine delivery: acknowledge so Stripe stops retrying
            tracing::warn!(error = %e, "Verified webhook event could not be parsed; ignoring");
            return Ok(Json(WebhookAck { received: true }));
        }
        Err(e) => {
            tracing::warn!(error = %e, "Webhook rejected");
            return Err(ApiError::InvalidSignature);
        }
    };

    let outcome = WebhookReconciler::new(state.identity.clone())
        .handle(&event)
        .await;
    tracing::debug!(event_id = %event.id, outcome = ?outcome, "Webhook handled");

    Ok(Json(WebhookAck { received: true }))
}

/// Behind the premium guard
pub async fn premium_status(Extension(record): Extension<IdentityRecord>) -> impl IntoResponse {
    tracing::debug!(user_id = %record.subject, "Premium status served");
    Json(PremiumResponse { is_premium: true })
}

/// Fallback for unknown routes
pub async fn not_found() -> Response {
    ApiError::NotFound("Not found.").into_response()
}
