//! keyword-extractor-plus HTTP gateway
//!
//! Axum server proxying keyword extraction to Google Natural Language,
//! billing to Stripe and user metadata to Auth0.

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyword_server::{AppState, Config, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration (.env first, then process environment)
    let config = Config::from_env();
    let state = AppState::from_config(config);

    report("Google Natural Language", state.extractor.is_some(), "GOOGLE_EXTRACTOR_KEY");
    report("Stripe", state.billing.is_some(), "STRIPE_SECRET_KEY");
    report("Stripe webhooks", state.webhooks.is_some(), "STRIPE_WEBHOOK_SECRET");
    report(
        "Auth0",
        state.identity.is_some(),
        "AUTH0_DOMAIN, AUTH0_CLIENT_ID and AUTH0_CLIENT_SECRET",
    );

    let addr = state.config.bind_addr.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 keyword gateway running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  POST /extract-keywords             - Extract salient keywords");
    tracing::info!("  POST /create-customer              - Create billing customer");
    tracing::info!("  POST /create-checkout-session      - One-time checkout");
    tracing::info!("  POST /create-subscription-session  - Subscription checkout (redirect)");
    tracing::info!("  POST /create-payment-intent        - Payment intent");
    tracing::info!("  GET  /check-subscription/:id       - Subscription status");
    tracing::info!("  POST /api/user-metadata            - User metadata");
    tracing::info!("  POST /api/verify-subscription      - Verify and refresh entitlement");
    tracing::info!("  GET  /premium/status               - Premium-only status check");
    tracing::info!("  POST /webhook                      - Stripe webhook");
    tracing::info!("  GET  /test, /health                - Liveness");
    tracing::info!("");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

fn report(vendor: &str, configured: bool, keys: &str) {
    if configured {
        tracing::info!("✓ {vendor} configured");
    } else {
        tracing::warn!("⚠ {vendor} not configured - dependent endpoints answer 500");
        tracing::warn!("  Set {keys} in .env");
    }
}
