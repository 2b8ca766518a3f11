//! # keyword-server
//!
//! The gateway: an Axum router over the vendor capabilities in
//! [`AppState`]. The binary in `main.rs` only loads configuration, builds
//! the state and serves [`router`].
//!
//! | Method & Path | Purpose |
//! |---|---|
//! | `POST /extract-keywords` | salient entities of `text` (rate-limited) |
//! | `POST /create-customer` | new Billing Customer |
//! | `POST /create-checkout-session` | one-time checkout, `{sessionId, url}` |
//! | `POST /create-subscription-session` | subscription checkout, 303 redirect |
//! | `POST /create-payment-intent` | `{clientSecret}` |
//! | `GET /check-subscription/{customerId}` | `{isPremium}` from the vendor |
//! | `POST /api/user-metadata` | metadata bag of the token's owner |
//! | `POST /api/verify-subscription` | verify now and promote the cached flag |
//! | `GET /premium/status` | premium-guarded status check |
//! | `POST /webhook` | signed Stripe events |
//! | `GET /test`, `GET /health` | liveness and configuration |

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod state;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;

use crate::handlers::{
    check_subscription, create_checkout_session, create_customer, create_payment_intent,
    create_subscription_session, extract_keywords, health_check, not_found, premium_status,
    stripe_webhook, test_handler, user_metadata, verify_subscription,
};

/// Build the application router
pub fn router(state: AppState) -> Router {
    let premium = Router::new()
        .route("/status", get(premium_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_premium));

    Router::new()
        // Liveness
        .route("/test", get(test_handler))
        .route("/health", get(health_check))

        // Extraction
        .route(
            "/extract-keywords",
            post(extract_keywords).route_layer(middleware::from_fn_with_state(
                state.clone(),
                rate_limit::limit_by_client,
            )),
        )

        // Billing
        .route("/create-customer", post(create_customer))
        .route("/create-checkout-session", post(create_checkout_session))
        .route("/create-subscription-session", post(create_subscription_session))
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/check-subscription/{customer_id}", get(check_subscription))
        .route("/webhook", post(stripe_webhook))

        // Identity
        .route("/api/user-metadata", post(user_metadata))
        .route("/api/verify-subscription", post(verify_subscription))
        .nest("/premium", premium)

        .fallback(not_found)
        .layer(cors(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS restricted to the configured browser origins
pub fn cors(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
