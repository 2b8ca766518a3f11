//! Gateway client

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config;

/// Extracted keyword for display
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub salience: f64,
}

/// Signed-in user's profile, as Auth0 `/userinfo` returns it
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// The parts of the metadata bag the client reads
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetadata {
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub free_usage_count: u32,
}

#[derive(Deserialize)]
struct ExtractResponse {
    keywords: Vec<Keyword>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutResponse {
    session_id: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PremiumResponse {
    is_premium: bool,
}

/// Error body the gateway sends
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: String,
}

/// Failed call, with the gateway's message when it sent one
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
    pub message: String,
    pub code: Option<String>,
}

impl ApiError {
    fn network(e: &reqwest::Error) -> Self {
        Self {
            message: format!("Could not reach the server: {e}"),
            code: None,
        }
    }

    pub fn is_free_tier_exhausted(&self) -> bool {
        self.code.as_deref() == Some("FREE_TIER_EXHAUSTED")
    }
}

async fn read<T: for<'de> Deserialize<'de>>(response: reqwest::Response, fallback: &str) -> Result<T, ApiError> {
    if response.status().is_success() {
        return response.json().await.map_err(|e| ApiError::network(&e));
    }

    match response.json::<ErrorBody>().await {
        Ok(body) => Err(ApiError {
            message: body.error,
            code: Some(body.code).filter(|c| !c.is_empty()),
        }),
        Err(_) => Err(ApiError {
            message: fallback.into(),
            code: None,
        }),
    }
}

/// Extract keywords; metered when `token` is given
pub async fn extract_keywords(text: &str, token: Option<&str>) -> Result<Vec<Keyword>, ApiError> {
    let mut request = reqwest::Client::new()
        .post(config::backend("/extract-keywords"))
        .json(&json!({ "text": text }));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(|e| ApiError::network(&e))?;
    read::<ExtractResponse>(response, "Error extracting keywords.")
        .await
        .map(|r| r.keywords)
}

/// Profile of the token's owner, straight from Auth0
pub async fn user_profile(token: &str) -> Result<UserProfile, ApiError> {
    let response = reqwest::Client::new()
        .get(format!("{}/userinfo", config::auth0_base()))
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| ApiError::network(&e))?;
    read(response, "Could not load your profile.").await
}

pub async fn user_metadata(token: &str) -> Result<UserMetadata, ApiError> {
    let response = reqwest::Client::new()
        .post(config::backend("/api/user-metadata"))
        .json(&json!({ "token": token }))
        .send()
        .await
        .map_err(|e| ApiError::network(&e))?;
    read(response, "Could not load your account.").await
}

pub async fn verify_subscription(token: &str) -> Result<bool, ApiError> {
    let response = reqwest::Client::new()
        .post(config::backend("/api/verify-subscription"))
        .json(&json!({ "token": token }))
        .send()
        .await
        .map_err(|e| ApiError::network(&e))?;
    read::<PremiumResponse>(response, "Could not verify your subscription.")
        .await
        .map(|r| r.is_premium)
}

/// Start a one-time checkout; returns the hosted checkout URL
pub async fn create_checkout(user: &UserProfile, customer_id: Option<&str>) -> Result<String, ApiError> {
    let response = reqwest::Client::new()
        .post(config::backend("/create-checkout-session"))
        .json(&json!({ "customerId": customer_id, "user": user }))
        .send()
        .await
        .map_err(|e| ApiError::network(&e))?;

    let session: CheckoutResponse = read(response, "Failed to create checkout").await?;
    session.url.ok_or_else(|| ApiError {
        message: format!("Checkout session {} has no URL", session.session_id),
        code: None,
    })
}
