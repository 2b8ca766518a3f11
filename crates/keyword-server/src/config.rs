//! Gateway Configuration
//!
//! Built once at startup and shared read-only. Vendor credentials are all
//! optional: a missing one disables the endpoints that need it instead of
//! stopping the process.

use std::time::Duration;

use keyword_payments::DEFAULT_FREE_LIMIT;
use keyword_runtime::{Auth0Config, GoogleNlpConfig};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:4200";
pub const DEFAULT_ALLOWED_ORIGINS: &str = "https://keyword-extractor-plus.netlify.app,http://localhost:4200";
pub const DEFAULT_RATE_LIMIT_PER_HOUR: u32 = 100;
pub const DEFAULT_VENDOR_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,

    /// Base URL for checkout success/cancel redirects
    pub frontend_url: String,

    /// Browser origins allowed by CORS
    pub allowed_origins: Vec<String>,

    pub google: Option<GoogleNlpConfig>,
    pub auth0: Option<Auth0Config>,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,

    /// Bound on every outbound vendor call
    pub vendor_timeout: Duration,

    /// Extraction requests per client address per hour
    pub rate_limit_per_hour: u32,

    /// Running behind a reverse proxy that appends to `X-Forwarded-For`
    pub trust_proxy: bool,

    /// Metered extractions before a signed-in user must pay
    pub free_tier_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Load `.env` (if any), then read the process environment.
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let vendor_timeout = Duration::from_secs(parse_or(
            "VENDOR_TIMEOUT_SECS",
            get("VENDOR_TIMEOUT_SECS"),
            DEFAULT_VENDOR_TIMEOUT.as_secs(),
        ));

        let bind_addr = get("BIND_ADDR")
            .or_else(|| get("PORT").map(|port| format!("0.0.0.0:{port}")))
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.into());

        let google = get("GOOGLE_EXTRACTOR_KEY").map(|key| {
            let config = GoogleNlpConfig::new(key).with_timeout(vendor_timeout);
            match get("GOOGLE_LANGUAGE_ENDPOINT") {
                Some(endpoint) => config.with_endpoint(endpoint),
                None => config,
            }
        });

        let auth0 = match (
            get("AUTH0_DOMAIN"),
            get("AUTH0_CLIENT_ID"),
            get("AUTH0_CLIENT_SECRET"),
        ) {
            (Some(domain), Some(client_id), Some(client_secret)) => {
                let mut config = Auth0Config::new(domain, client_id, client_secret);
                config.audience = get("AUTH0_AUDIENCE");
                config.timeout = vendor_timeout;
                Some(config)
            }
            _ => None,
        };

        Self {
            bind_addr,
            frontend_url: get("FRONTEND_URL")
                .unwrap_or_else(|| DEFAULT_FRONTEND_URL.into())
                .trim_end_matches('/')
                .to_string(),
            allowed_origins: split_list(
                &get("ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.into()),
            ),
            google,
            auth0,
            stripe_secret_key: get("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: get("STRIPE_WEBHOOK_SECRET"),
            vendor_timeout,
            rate_limit_per_hour: parse_or(
                "RATE_LIMIT_PER_HOUR",
                get("RATE_LIMIT_PER_HOUR"),
                DEFAULT_RATE_LIMIT_PER_HOUR,
            ),
            trust_proxy: parse_or("TRUST_PROXY", get("TRUST_PROXY"), false),
            free_tier_limit: parse_or("FREE_TIER_LIMIT", get("FREE_TIER_LIMIT"), DEFAULT_FREE_LIMIT),
        }
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    let Some(raw) = value else {
        return default;
    };
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = %raw, default = %default, "Unparseable setting, using default");
        default
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.trim_end_matches('/').to_string())
        .collect()
}
