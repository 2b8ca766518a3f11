//! API Errors
//!
//! Every handler failure ends up here. The caller sees `{error, code}` with a
//! generic message; vendor detail is logged when the error is built.

use std::fmt::Display;
use std::time::Duration;

use axum::{
    Form, Json,
    extract::{
        FromRequest, Request,
        rejection::{FormRejection, JsonRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use keyword_core::VendorError;
use keyword_payments::PaymentError;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input; no vendor was called
    #[error("{0}")]
    Validation(String),

    /// A vendor credential is absent from configuration
    #[error("{0} not configured")]
    Misconfigured(&'static str),

    /// A vendor call failed; detail was logged
    #[error("{0}")]
    Upstream(&'static str),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Invalid webhook signature.")]
    InvalidSignature,

    #[error("Too many requests from this IP, please try again after an hour.")]
    RateLimited { retry_after: Duration },

    #[error("Free tier limit of {limit} extractions reached. Upgrade to continue.")]
    FreeTierExhausted { limit: u32 },

    #[error("Premium subscription required.")]
    PremiumRequired,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Missing credential, logged apart from vendor failures
    pub fn misconfigured(component: &'static str) -> Self {
        tracing::error!(component, "Endpoint unavailable: {component} not configured");
        Self::Misconfigured(component)
    }

    /// Vendor failure: log `err` in full, answer with `message` only
    pub fn upstream(message: &'static str, err: &impl Display) -> Self {
        tracing::error!(error = %err, "{message}");
        Self::Upstream(message)
    }

    /// Map an identity-provider failure
    pub fn identity(message: &'static str, err: &VendorError) -> Self {
        match err {
            VendorError::Auth(_) => {
                tracing::info!(error = %err, "Identity token rejected");
                Self::Unauthorized("Invalid or expired token.")
            }
            VendorError::NotFound(_) => {
                tracing::warn!(error = %err, "Identity record not found");
                Self::NotFound("User not found.")
            }
            _ => Self::upstream(message, err),
        }
    }

    /// Map a payments failure
    pub fn payment(message: &'static str, err: &PaymentError) -> Self {
        match err {
            PaymentError::InvalidCustomer(_) => Self::Validation(err.user_message().into()),
            PaymentError::Config(_) => {
                tracing::error!(error = %err, "Payments misconfigured");
                Self::Misconfigured("payments")
            }
            PaymentError::Identity(e) => Self::identity(message, e),
            _ => Self::upstream(message, err),
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::Misconfigured(_) | Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::FreeTierExhausted { .. } => StatusCode::PAYMENT_REQUIRED,
            Self::PremiumRequired => StatusCode::FORBIDDEN,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Misconfigured(_) => "MISCONFIGURED",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::FreeTierExhausted { .. } => "FREE_TIER_EXHAUSTED",
            Self::PremiumRequired => "PREMIUM_REQUIRED",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Misconfigured(_) => "Service configuration error.".into(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message(),
            code: self.code(),
        });

        let mut response = (self.status(), body).into_response();
        if let Self::RateLimited { retry_after } = self {
            let secs = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

/// `Json` extractor whose rejections answer in the `{error, code}` shape
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Body from either a JSON request or a plain HTML form post, chosen by
/// `Content-Type`
#[derive(Debug)]
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(value) = Form::<T>::from_request(request, state).await?;
            Ok(Self(value))
        } else {
            let Json(value) = Json::<T>::from_request(request, state).await?;
            Ok(Self(value))
        }
    }
}
