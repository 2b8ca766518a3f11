//! Bearer tokens and the premium guard

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use keyword_core::IdentityRecord;
use keyword_payments::is_entitled;

use crate::error::ApiError;
use crate::state::AppState;

/// Token from `Authorization: Bearer <token>`, if any
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Resolve a user token to its Identity Record
pub async fn record_for_token(state: &AppState, token: &str) -> Result<IdentityRecord, ApiError> {
    let identity = state
        .identity
        .as_ref()
        .ok_or_else(|| ApiError::misconfigured("identity provider"))?;

    let profile = identity
        .user_from_token(token)
        .await
        .map_err(|e| ApiError::identity("Failed to verify user.", &e))?;

    identity
        .get_record(&profile.sub)
        .await
        .map_err(|e| ApiError::identity("Failed to load user.", &e))
}

/// Admit only callers whose cached entitlement flag is set. The record is
/// passed on as a request extension.
pub async fn require_premium(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_string) else {
        return ApiError::Unauthorized("Missing bearer token.").into_response();
    };

    let record = match record_for_token(&state, &token).await {
        Ok(record) => record,
        Err(e) => return e.into_response(),
    };

    if !is_entitled(&record.metadata) {
        tracing::debug!(user_id = %record.subject, "Premium route refused");
        return ApiError::PremiumRequired.into_response();
    }

    request.extensions_mut().insert(record);
    next.run(request).await
}
