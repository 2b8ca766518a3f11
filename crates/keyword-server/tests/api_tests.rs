//! Router tests against in-memory vendors

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use keyword_core::mock::{MemoryIdentityProvider, MockExtractor};
use keyword_core::{Entity, IdentityRecord};
use keyword_payments::SIGNATURE_HEADER;
use keyword_payments::mock::{MemoryBillingProvider, checkout_session_event, sign_payload};
use keyword_server::{AppState, Config, router};

const WEBHOOK_SECRET: &str = "whsec_test_secret";

fn config(pairs: &[(&str, &str)]) -> Config {
    let pairs: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    Config::from_lookup(move |key| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    })
}

fn obama_extractor() -> Arc<MockExtractor> {
    Arc::new(MockExtractor::with_entities(vec![
        Entity::new("Barack Obama", "PERSON", 0.8),
        Entity::new("Hawaii", "LOCATION", 0.05),
    ]))
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    (status, json_body(response).await)
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
}

// ============================================================================
// Extraction
// ============================================================================

#[tokio::test]
async fn test_extract_filters_low_salience() {
    let extractor = obama_extractor();
    let app = router(AppState::new(Config::default()).with_extractor(extractor.clone()));

    let (status, body) = send(
        app,
        post_json("/extract-keywords", &json!({"text": "Barack Obama was born in Hawaii."})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "keywords": [{"name": "Barack Obama", "type": "PERSON", "salience": 0.8}]
        })
    );
    assert_eq!(extractor.calls(), 1);
}

#[tokio::test]
async fn test_blank_text_makes_no_vendor_call() {
    let extractor = obama_extractor();
    let state = AppState::new(Config::default()).with_extractor(extractor.clone());

    for body in [json!({"text": ""}), json!({"text": " \n\t "}), json!({})] {
        let (status, body) = send(router(state.clone()), post_json("/extract-keywords", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let app = router(AppState::new(Config::default()).with_extractor(obama_extractor()));

    let request = Request::builder()
        .method("POST")
        .uri("/extract-keywords")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_extractor_is_misconfigured() {
    let app = router(AppState::new(Config::default()));

    let (status, body) = send(app, post_json("/extract-keywords", &json!({"text": "hello"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "MISCONFIGURED");
}

#[tokio::test]
async fn test_vendor_failure_is_generic() {
    let app = router(AppState::new(Config::default()).with_extractor(Arc::new(MockExtractor::failing())));

    let (status, body) = send(app, post_json("/extract-keywords", &json!({"text": "hello"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to extract keywords.");
    assert!(!body.to_string().contains("mock extractor offline"));
}

fn extract_from(peer: &str, forwarded_for: Option<&str>) -> Request<Body> {
    let mut request = post_json("/extract-keywords", &json!({"text": "hello"}));
    let peer: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    if let Some(hop) = forwarded_for {
        request
            .headers_mut()
            .insert("x-forwarded-for", hop.parse().unwrap());
    }
    request
}

#[tokio::test]
async fn test_rate_limit_blocks_before_vendor() {
    let extractor = obama_extractor();
    let state = AppState::new(config(&[("RATE_LIMIT_PER_HOUR", "2")])).with_extractor(extractor.clone());

    for _ in 0..2 {
        let (status, _) = send(router(state.clone()), extract_from("198.51.100.4:40000", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    // Same host, new source port: still the same client
    let response = router(state.clone())
        .oneshot(extract_from("198.51.100.4:40001", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    assert_eq!(json_body(response).await["code"], "RATE_LIMITED");
    assert_eq!(extractor.calls(), 2);

    // Another client still gets through
    let (status, _) = send(router(state), extract_from("198.51.100.5:40000", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_escape_limit() {
    let extractor = obama_extractor();
    let state = AppState::new(config(&[("RATE_LIMIT_PER_HOUR", "1")])).with_extractor(extractor.clone());

    let mut ok = 0;
    for i in 0..50 {
        let hop = format!("203.0.113.{i}");
        let (status, _) = send(
            router(state.clone()),
            extract_from("198.51.100.4:40000", Some(&hop)),
        )
        .await;
        if status == StatusCode::OK {
            ok += 1;
        } else {
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(extractor.calls(), 1);
    assert_eq!(state.limiter.tracked(), 1);
}

#[tokio::test]
async fn test_trusted_proxy_keys_on_forwarded_client() {
    let extractor = obama_extractor();
    let state = AppState::new(config(&[("RATE_LIMIT_PER_HOUR", "1"), ("TRUST_PROXY", "true")]))
        .with_extractor(extractor.clone());

    // Two clients behind the same proxy are limited separately
    for hop in ["203.0.113.1", "203.0.113.2"] {
        let (status, _) = send(router(state.clone()), extract_from("10.0.0.1:5000", Some(hop))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = send(
        router(state),
        extract_from("10.0.0.1:5000", Some("198.51.100.77, 203.0.113.1")),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(extractor.calls(), 2);
}

#[tokio::test]
async fn test_free_tier_metering() {
    let extractor = obama_extractor();
    let identity = Arc::new(
        MemoryIdentityProvider::new()
            .with_record(IdentityRecord::new("auth0|free"))
            .with_token("tok-free", "auth0|free"),
    );
    let state = AppState::new(config(&[("FREE_TIER_LIMIT", "2")]))
        .with_extractor(extractor.clone())
        .with_identity(identity.clone());

    let request = || {
        let mut request = post_json("/extract-keywords", &json!({"text": "hello"}));
        request
            .headers_mut()
            .insert(header::AUTHORIZATION, "Bearer tok-free".parse().unwrap());
        request
    };

    for _ in 0..2 {
        let (status, _) = send(router(state.clone()), request()).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(identity.record("auth0|free").unwrap().metadata.free_usage_count, 2);

    let (status, body) = send(router(state), request()).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["code"], "FREE_TIER_EXHAUSTED");
    assert_eq!(extractor.calls(), 2);
}

#[tokio::test]
async fn test_rejected_token_on_extract() {
    let extractor = obama_extractor();
    let state = AppState::new(Config::default())
        .with_extractor(extractor.clone())
        .with_identity(Arc::new(MemoryIdentityProvider::new()));

    let mut request = post_json("/extract-keywords", &json!({"text": "hello"}));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer nope".parse().unwrap());
    let (status, body) = send(router(state), request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(extractor.calls(), 0);
}

// ============================================================================
// Billing
// ============================================================================

#[tokio::test]
async fn test_checkout_reuses_cached_customer() {
    let billing = Arc::new(MemoryBillingProvider::new());
    let identity = Arc::new(
        MemoryIdentityProvider::new()
            .with_record(IdentityRecord::new("auth0|paid").with_customer_id("cus_existing")),
    );
    let app = router(
        AppState::new(Config::default())
            .with_billing(billing.clone())
            .with_identity(identity.clone()),
    );

    let (status, body) = send(
        app,
        post_json(
            "/create-checkout-session",
            &json!({"user": {"sub": "auth0|paid", "email": "paid@example.com"}}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["sessionId"].as_str().unwrap().starts_with("cs_test_"));
    assert_eq!(billing.created_customers(), 0);
    assert_eq!(identity.update_calls(), 0);

    let sessions = billing.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].customer_id, "cus_existing");
    assert_eq!(sessions[0].user_id.as_deref(), Some("auth0|paid"));
    assert!(sessions[0].success_url.starts_with("http://localhost:4200/success"));
}

#[tokio::test]
async fn test_checkout_creates_and_caches_customer_once() {
    let billing = Arc::new(MemoryBillingProvider::new());
    let identity = Arc::new(
        MemoryIdentityProvider::new()
            .with_record(IdentityRecord::new("auth0|new").with_email("new@example.com")),
    );
    let state = AppState::new(Config::default())
        .with_billing(billing.clone())
        .with_identity(identity.clone());
    let body = json!({"user": {"sub": "auth0|new", "email": "new@example.com", "name": "New"}});

    let (status, _) = send(router(state.clone()), post_json("/create-checkout-session", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(billing.created_customers(), 1);

    let cached = identity.record("auth0|new").unwrap().metadata.stripe_customer_id;
    assert_eq!(cached.as_deref(), Some("cus_mem1"));

    // Second purchase finds the cached id
    let (status, _) = send(router(state), post_json("/create-checkout-session", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(billing.created_customers(), 1);
    assert_eq!(billing.sessions()[1].customer_id, "cus_mem1");
}

#[tokio::test]
async fn test_checkout_survives_failed_cache_write() {
    let billing = Arc::new(MemoryBillingProvider::new());
    let identity = Arc::new(MemoryIdentityProvider::new().with_record(IdentityRecord::new("auth0|x")));
    identity.fail_updates();
    let app = router(
        AppState::new(Config::default())
            .with_billing(billing.clone())
            .with_identity(identity),
    );

    let (status, body) = send(
        app,
        post_json("/create-checkout-session", &json!({"user": {"sub": "auth0|x"}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["sessionId"].is_string());
    assert_eq!(billing.created_customers(), 1);
}

#[tokio::test]
async fn test_checkout_uses_request_customer_without_identity() {
    let billing = Arc::new(MemoryBillingProvider::new());
    let app = router(AppState::new(Config::default()).with_billing(billing.clone()));

    let (status, _) = send(
        app,
        post_json("/create-checkout-session", &json!({"customerId": "cus_given"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(billing.created_customers(), 0);
    assert_eq!(billing.sessions()[0].customer_id, "cus_given");
}

#[tokio::test]
async fn test_checkout_requires_someone() {
    let billing = Arc::new(MemoryBillingProvider::new());
    let app = router(AppState::new(Config::default()).with_billing(billing.clone()));

    let (status, body) = send(app, post_json("/create-checkout-session", &json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(billing.sessions().is_empty());
}

#[tokio::test]
async fn test_subscription_session_redirects() {
    let billing = Arc::new(MemoryBillingProvider::new());
    let app = router(AppState::new(Config::default()).with_billing(billing.clone()));

    let response = app
        .oneshot(post_json(
            "/create-subscription-session",
            &json!({"customerId": "cus_sub"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://checkout.stripe.test/"));
    assert_eq!(billing.sessions()[0].mode.as_str(), "subscription");
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_subscription_form_post_redirects() {
    let billing = Arc::new(MemoryBillingProvider::new());
    let identity = identity_with_user(false);
    let app = router(
        AppState::new(Config::default())
            .with_billing(billing.clone())
            .with_identity(identity),
    );

    let response = app
        .oneshot(post_form(
            "/create-subscription-session",
            "token=tok-u&customerId=",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://checkout.stripe.test/"));

    // Buyer read from the token; customer from their record
    let sessions = billing.sessions();
    assert_eq!(sessions[0].mode.as_str(), "subscription");
    assert_eq!(sessions[0].customer_id, "cus_u");
    assert_eq!(sessions[0].user_id.as_deref(), Some("auth0|u"));
    assert!(sessions[0].success_url.contains("mode=subscription"));
    assert_eq!(billing.created_customers(), 0);
}

#[tokio::test]
async fn test_subscription_form_post_errors() {
    let billing = Arc::new(MemoryBillingProvider::new());
    let state = AppState::new(Config::default())
        .with_billing(billing.clone())
        .with_identity(identity_with_user(false));

    // Nobody to bill
    let (status, body) = send(
        router(state.clone()),
        post_form("/create-subscription-session", "customerId="),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    // Token the identity provider rejects
    let (status, _) = send(
        router(state),
        post_form("/create-subscription-session", "token=stale"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(billing.sessions().is_empty());
}

#[tokio::test]
async fn test_create_customer() {
    let billing = Arc::new(MemoryBillingProvider::new());
    let state = AppState::new(Config::default()).with_billing(billing.clone());

    let (status, body) = send(
        router(state.clone()),
        post_json("/create-customer", &json!({"email": "a@example.com", "name": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customerId"], "cus_mem1");

    let (status, _) = send(router(state), post_json("/create-customer", &json!({"name": "A"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(billing.created_customers(), 1);
}

#[tokio::test]
async fn test_billing_failure_is_generic() {
    let app = router(AppState::new(Config::default()).with_billing(Arc::new(MemoryBillingProvider::failing())));

    let (status, body) = send(
        app,
        post_json("/create-customer", &json!({"email": "a@example.com"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to create customer in Stripe.");
}

#[tokio::test]
async fn test_payment_intent_amount() {
    let state = AppState::new(Config::default()).with_billing(Arc::new(MemoryBillingProvider::new()));

    let (status, body) = send(
        router(state.clone()),
        post_json("/create-payment-intent", &json!({"amount": 999})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["clientSecret"].as_str().unwrap().contains("_secret_"));

    for amount in [json!(0), json!(-5), Value::Null] {
        let (status, _) = send(
            router(state.clone()),
            post_json("/create-payment-intent", &json!({"amount": amount})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_check_subscription() {
    let state = AppState::new(Config::default())
        .with_billing(Arc::new(MemoryBillingProvider::new().with_active_subscription("cus_paid")));

    let (status, body) = send(router(state.clone()), get("/check-subscription/cus_paid")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"isPremium": true}));

    let (_, body) = send(router(state), get("/check-subscription/cus_free")).await;
    assert_eq!(body, json!({"isPremium": false}));
}

#[tokio::test]
async fn test_billing_endpoints_misconfigured() {
    let state = AppState::new(Config::default());

    for request in [
        post_json("/create-customer", &json!({"email": "a@example.com"})),
        post_json("/create-checkout-session", &json!({"customerId": "cus_1"})),
        post_json("/create-payment-intent", &json!({"amount": 100})),
        get("/check-subscription/cus_1"),
    ] {
        let (status, body) = send(router(state.clone()), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "MISCONFIGURED");
    }
}

// ============================================================================
// Webhook
// ============================================================================

fn webhook_state(identity: Arc<MemoryIdentityProvider>) -> AppState {
    AppState::new(config(&[("STRIPE_WEBHOOK_SECRET", WEBHOOK_SECRET)])).with_identity(identity)
}

fn signed_webhook(payload: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn checkout_completed(customer_id: &str) -> String {
    checkout_session_event("checkout.session.completed", Some(customer_id))
}

#[tokio::test]
async fn test_webhook_redelivery_is_idempotent() {
    let identity = Arc::new(
        MemoryIdentityProvider::new()
            .with_record(IdentityRecord::new("auth0|buyer").with_customer_id("cus_buyer")),
    );
    let state = webhook_state(identity.clone());
    let payload = checkout_completed("cus_buyer");
    let signature = sign_payload(WEBHOOK_SECRET, &payload).unwrap();

    for _ in 0..2 {
        let (status, body) = send(router(state.clone()), signed_webhook(&payload, &signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"received": true}));
        assert!(identity.record("auth0|buyer").unwrap().metadata.is_premium);
    }

    assert_eq!(identity.update_calls(), 1);
}

#[tokio::test]
async fn test_webhook_bad_signature_changes_nothing() {
    let identity = Arc::new(
        MemoryIdentityProvider::new()
            .with_record(IdentityRecord::new("auth0|buyer").with_customer_id("cus_buyer")),
    );
    let state = webhook_state(identity.clone());
    let payload = checkout_completed("cus_buyer");
    let forged = sign_payload("whsec_wrong", &payload).unwrap();

    let (status, body) = send(router(state.clone()), signed_webhook(&payload, &forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_SIGNATURE");

    // Missing header entirely
    let request = Request::builder()
        .method("POST")
        .uri("/webhook")
        .body(Body::from(payload))
        .unwrap();
    let (status, _) = send(router(state), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(identity.update_calls(), 0);
    assert!(!identity.record("auth0|buyer").unwrap().metadata.is_premium);
}

#[tokio::test]
async fn test_webhook_unmatched_and_ignored_are_acknowledged() {
    let identity = Arc::new(MemoryIdentityProvider::new());
    let state = webhook_state(identity.clone());

    let unmatched = checkout_completed("cus_nobody");
    let ignored = checkout_session_event("checkout.session.expired", Some("cus_nobody"));
    // Signed, but not an event shape this build understands
    let unreadable = json!({"id": "evt_2", "type": "invoice.paid", "data": {"object": {}}}).to_string();

    for payload in [unmatched, ignored, unreadable] {
        let signature = sign_payload(WEBHOOK_SECRET, &payload).unwrap();
        let (status, body) = send(router(state.clone()), signed_webhook(&payload, &signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"received": true}));
    }

    assert_eq!(identity.update_calls(), 0);
}

#[tokio::test]
async fn test_webhook_without_secret_is_misconfigured() {
    let app = router(AppState::new(Config::default()));

    let (status, body) = send(app, signed_webhook("{}", "t=1,v1=00")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "MISCONFIGURED");
}

// ============================================================================
// Identity & entitlement
// ============================================================================

fn identity_with_user(premium: bool) -> Arc<MemoryIdentityProvider> {
    let record = IdentityRecord::new("auth0|u").with_customer_id("cus_u");
    let record = if premium { record.premium() } else { record };
    Arc::new(MemoryIdentityProvider::new().with_record(record).with_token("tok-u", "auth0|u"))
}

#[tokio::test]
async fn test_user_metadata() {
    let state = AppState::new(Config::default()).with_identity(identity_with_user(true));

    let (status, body) = send(router(state.clone()), post_json("/api/user-metadata", &json!({"token": "tok-u"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stripeCustomerId"], "cus_u");
    assert_eq!(body["isPremium"], true);

    let (status, _) = send(router(state.clone()), post_json("/api/user-metadata", &json!({"token": "bogus"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(router(state), post_json("/api/user-metadata", &json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_subscription_promotes_flag() {
    let identity = identity_with_user(false);
    let state = AppState::new(Config::default())
        .with_identity(identity.clone())
        .with_billing(Arc::new(MemoryBillingProvider::new().with_active_subscription("cus_u")));

    let (status, body) = send(
        router(state),
        post_json("/api/verify-subscription", &json!({"token": "tok-u"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"isPremium": true}));
    assert!(identity.record("auth0|u").unwrap().metadata.is_premium);
}

#[tokio::test]
async fn test_premium_guard() {
    let bearer = |uri: &str| {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, "Bearer tok-u")
            .body(Body::empty())
            .unwrap()
    };

    let premium = AppState::new(Config::default()).with_identity(identity_with_user(true));
    let (status, body) = send(router(premium), bearer("/premium/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"isPremium": true}));

    let free = AppState::new(Config::default()).with_identity(identity_with_user(false));
    let (status, body) = send(router(free.clone()), bearer("/premium/status")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "PREMIUM_REQUIRED");

    let (status, _) = send(router(free), get("/premium/status")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Liveness
// ============================================================================

#[tokio::test]
async fn test_liveness_and_health() {
    let state = AppState::new(Config::default()).with_extractor(obama_extractor());

    let (status, body) = send(router(state.clone()), get("/test")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("I'm working!".into()));

    let (status, body) = send(router(state.clone()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["extraction_configured"], true);
    assert_eq!(body["stripe_configured"], false);
    assert_eq!(body["identity_configured"], false);

    let (status, body) = send(router(state), get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
