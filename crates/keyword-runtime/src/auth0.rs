//! Auth0 Identity Provider
//!
//! Implementation of `IdentityProvider` over Auth0:
//!
//! - `/userinfo` resolves a user's access token to their profile
//! - the Management API (`/api/v2/users`) reads records and merges
//!   `app_metadata`, authenticated with a client-credentials token that is
//!   cached until shortly before it expires

use std::time::{Duration, Instant};

use async_trait::async_trait;
use keyword_core::{
    IdentityProvider, IdentityRecord, MetadataPatch, Result, UserMetadata, UserProfile, VendorError,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::http::{build_client, status_error, transport_error};

/// Refresh the management token this long before Auth0 says it expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Auth0 provider configuration
#[derive(Clone, Debug)]
pub struct Auth0Config {
    /// Tenant domain (`tenant.auth0.com`) or a full base URL
    pub domain: String,

    /// Machine-to-machine application credentials
    pub client_id: String,
    pub client_secret: String,

    /// Management API audience; defaults to `https://{domain}/api/v2/`
    pub audience: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Auth0Config {
    pub fn new(
        domain: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            audience: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Base URL, with `https://` added to bare domains
    pub fn base_url(&self) -> String {
        let domain = self.domain.trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        }
    }

    pub fn audience(&self) -> String {
        self.audience
            .clone()
            .unwrap_or_else(|| format!("{}/api/v2/", self.base_url()))
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

const fn default_expires_in() -> u64 {
    86_400
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Management API user shape
#[derive(Deserialize)]
struct Auth0User {
    user_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    app_metadata: Option<UserMetadata>,
}

impl From<Auth0User> for IdentityRecord {
    fn from(user: Auth0User) -> Self {
        Self {
            subject: user.user_id,
            email: user.email,
            name: user.name,
            metadata: user.app_metadata.unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct MetadataUpdate<'a> {
    app_metadata: &'a MetadataPatch,
}

/// Auth0 identity provider
pub struct Auth0IdentityProvider {
    http: reqwest::Client,
    config: Auth0Config,
    base: Url,
    token: Mutex<Option<CachedToken>>,
}

impl Auth0IdentityProvider {
    /// Create from configuration
    pub fn from_config(config: Auth0Config) -> Result<Self> {
        let base = Url::parse(&config.base_url())
            .map_err(|e| VendorError::Config(format!("AUTH0_DOMAIN: {e}")))?;

        Ok(Self {
            http: build_client(config.timeout)?,
            config,
            base,
            token: Mutex::new(None),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| VendorError::Config("AUTH0_DOMAIN is not a base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Management API token, fetched with the client-credentials grant
    async fn management_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(ref token) = *cached {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let request = TokenRequest {
            grant_type: "client_credentials",
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            audience: self.config.audience(),
        };

        let response = self
            .http
            .post(self.url(&["oauth", "token"])?)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        tracing::debug!(expires_in = token.expires_in, "Fetched Auth0 management token");

        *cached = Instant::now()
            .checked_add(Duration::from_secs(token.expires_in))
            .map(|expires_at| CachedToken {
                value: token.access_token.clone(),
                expires_at,
            });
        if cached.is_none() {
            tracing::warn!(expires_in = token.expires_in, "Token lifetime out of range, not caching");
        }
        Ok(token.access_token)
    }
}

/// Stripe customer ids are `cus_` plus alphanumerics; anything else would
/// need escaping inside the Lucene query.
fn is_searchable_id(customer_id: &str) -> bool {
    !customer_id.is_empty()
        && customer_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[async_trait]
impl IdentityProvider for Auth0IdentityProvider {
    async fn user_from_token(&self, token: &str) -> Result<UserProfile> {
        let response = self
            .http
            .get(self.url(&["userinfo"])?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))
    }

    async fn get_record(&self, subject: &str) -> Result<IdentityRecord> {
        let token = self.management_token().await?;
        let response = self
            .http
            .get(self.url(&["api", "v2", "users", subject])?)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let user: Auth0User = response
            .json()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;
        Ok(user.into())
    }

    async fn update_metadata(&self, subject: &str, patch: &MetadataPatch) -> Result<()> {
        let token = self.management_token().await?;
        let response = self
            .http
            .patch(self.url(&["api", "v2", "users", subject])?)
            .bearer_auth(token)
            .json(&MetadataUpdate { app_metadata: patch })
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        tracing::debug!(subject = %subject, "Updated Auth0 app_metadata");
        Ok(())
    }

    async fn find_by_customer_id(&self, customer_id: &str) -> Result<Vec<IdentityRecord>> {
        if !is_searchable_id(customer_id) {
            return Err(VendorError::Other(format!(
                "refusing to search for customer id {customer_id:?}"
            )));
        }

        let token = self.management_token().await?;
        let query = format!("app_metadata.stripeCustomerId:\"{customer_id}\"");
        let response = self
            .http
            .get(self.url(&["api", "v2", "users"])?)
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("search_engine", "v3")])
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let users: Vec<Auth0User> = response
            .json()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;
        Ok(users.into_iter().map(IdentityRecord::from).collect())
    }

    fn name(&self) -> &str {
        "Auth0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn provider_for(server: &mockito::Server) -> Auth0IdentityProvider {
        Auth0IdentityProvider::from_config(Auth0Config::new(server.url(), "cid", "secret")).unwrap()
    }

    async fn mock_token(server: &mut mockito::Server, hits: usize) -> mockito::Mock {
        mock_token_lasting(server, 86_400, hits).await
    }

    async fn mock_token_lasting(server: &mut mockito::Server, expires_in: u64, hits: usize) -> mockito::Mock {
        server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "grant_type": "client_credentials",
                "client_id": "cid",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"access_token": "mgmt-token", "expires_in": {expires_in}, "token_type": "Bearer"}}"#
            ))
            .expect(hits)
            .create_async()
            .await
    }

    #[test]
    fn test_base_url_and_audience() {
        let config = Auth0Config::new("tenant.auth0.com", "id", "secret");
        assert_eq!(config.base_url(), "https://tenant.auth0.com");
        assert_eq!(config.audience(), "https://tenant.auth0.com/api/v2/");

        let config = Auth0Config::new("http://127.0.0.1:9999/", "id", "secret");
        assert_eq!(config.base_url(), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_searchable_ids() {
        assert!(is_searchable_id("cus_Q1w2E3"));
        assert!(!is_searchable_id("cus\" OR *:*"));
        assert!(!is_searchable_id(""));
    }

    #[tokio::test]
    async fn test_userinfo_resolves_profile() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/userinfo")
            .match_header("authorization", "Bearer user-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sub": "user-1", "email": "a@example.com", "name": "Ada"}"#)
            .create_async()
            .await;

        let profile = provider_for(&server).user_from_token("user-token").await.unwrap();
        assert_eq!(profile.sub, "user-1");
        assert_eq!(profile.name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_rejected_user_token_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/userinfo")
            .with_status(401)
            .with_body("Unauthorized")
            .create_async()
            .await;

        let err = provider_for(&server).user_from_token("expired").await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn test_management_token_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let token = mock_token(&mut server, 1).await;
        let user = server
            .mock("GET", "/api/v2/users/user-1")
            .match_header("authorization", "Bearer mgmt-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"user_id": "user-1", "email": "a@example.com",
                    "app_metadata": {"stripeCustomerId": "cus_1", "isPremium": true}}"#,
            )
            .expect(2)
            .create_async()
            .await;

        let provider = provider_for(&server);
        let first = provider.get_record("user-1").await.unwrap();
        let second = provider.get_record("user-1").await.unwrap();

        token.assert_async().await;
        user.assert_async().await;
        assert_eq!(first, second);
        assert_eq!(first.metadata.customer_id(), Some("cus_1"));
        assert!(first.metadata.is_premium);
    }

    #[tokio::test]
    async fn test_huge_token_lifetime_is_not_cached() {
        let mut server = mockito::Server::new_async().await;
        let token = mock_token_lasting(&mut server, u64::MAX, 2).await;
        let _user = server
            .mock("GET", "/api/v2/users/user-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"user_id": "user-1", "app_metadata": {}}"#)
            .expect(2)
            .create_async()
            .await;

        let provider = provider_for(&server);
        provider.get_record("user-1").await.unwrap();
        provider.get_record("user-1").await.unwrap();

        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_sends_only_patched_keys() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, 1).await;
        let patch = server
            .mock("PATCH", "/api/v2/users/user-1")
            .match_body(Matcher::Json(serde_json::json!({
                "app_metadata": { "stripeCustomerId": "cus_9" }
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        provider_for(&server)
            .update_metadata("user-1", &MetadataPatch::customer_id("cus_9"))
            .await
            .unwrap();
        patch.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_by_customer_id() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server, 1).await;
        let _search = server
            .mock("GET", "/api/v2/users")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "app_metadata.stripeCustomerId:\"cus_1\"".into()),
                Matcher::UrlEncoded("search_engine".into(), "v3".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"user_id": "user-1", "app_metadata": {"stripeCustomerId": "cus_1"}}]"#)
            .create_async()
            .await;

        let found = provider_for(&server).find_by_customer_id("cus_1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].subject, "user-1");
    }
}
