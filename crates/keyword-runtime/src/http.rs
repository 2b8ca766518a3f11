//! Shared reqwest plumbing

use std::time::Duration;

use keyword_core::{Result, VendorError};
use reqwest::StatusCode;

/// Longest slice of a vendor error body kept for logs.
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| VendorError::Config(format!("HTTP client: {e}")))
}

/// Classify a transport-level failure. The URL is stripped so query
/// parameters never reach the logs.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> VendorError {
    let err = err.without_url();
    if err.is_timeout() {
        VendorError::Timeout(timeout)
    } else if err.is_decode() {
        VendorError::Malformed(err.to_string())
    } else {
        VendorError::ProviderUnavailable(err.to_string())
    }
}

/// Turn a non-2xx response into an error carrying the vendor's body.
pub(crate) async fn status_error(response: reqwest::Response) -> VendorError {
    let status = response.status();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            VendorError::Auth(format!("{status}: {body}"))
        }
        StatusCode::NOT_FOUND => VendorError::NotFound(body),
        StatusCode::TOO_MANY_REQUESTS => VendorError::Provider(format!("quota exceeded: {body}")),
        _ => VendorError::Provider(format!("{status}: {body}")),
    }
}
