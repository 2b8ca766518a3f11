//! Google Natural Language Extractor
//!
//! Implementation of `EntityExtractor` backed by `documents:analyzeEntities`.

use std::time::Duration;

use async_trait::async_trait;
use keyword_core::{Entity, EntityExtractor, Result};
use serde::{Deserialize, Serialize};

use crate::http::{build_client, status_error, transport_error};

pub const DEFAULT_ENDPOINT: &str = "https://language.googleapis.com/v1/documents:analyzeEntities";

/// Google provider configuration
#[derive(Clone, Debug)]
pub struct GoogleNlpConfig {
    /// API key, sent as `x-goog-api-key`
    pub api_key: String,

    /// Full analyzeEntities URL
    pub endpoint: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl GoogleNlpConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.into(),
            timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeEntitiesRequest<'a> {
    document: Document<'a>,
    encoding_type: &'static str,
}

#[derive(Serialize)]
struct Document<'a> {
    content: &'a str,
    #[serde(rename = "type")]
    doc_type: &'static str,
}

#[derive(Deserialize)]
struct AnalyzeEntitiesResponse {
    #[serde(default)]
    entities: Vec<GoogleEntity>,
}

#[derive(Deserialize)]
struct GoogleEntity {
    name: String,
    #[serde(rename = "type", default)]
    entity_type: String,
    #[serde(default)]
    salience: f64,
}

impl From<GoogleEntity> for Entity {
    fn from(e: GoogleEntity) -> Self {
        Self::new(e.name, e.entity_type, e.salience)
    }
}

/// Google Natural Language entity extractor
pub struct GoogleNlpExtractor {
    http: reqwest::Client,
    config: GoogleNlpConfig,
}

impl GoogleNlpExtractor {
    /// Create from configuration
    pub fn from_config(config: GoogleNlpConfig) -> Result<Self> {
        Ok(Self {
            http: build_client(config.timeout)?,
            config,
        })
    }
}

#[async_trait]
impl EntityExtractor for GoogleNlpExtractor {
    async fn analyze_entities(&self, text: &str) -> Result<Vec<Entity>> {
        let request = AnalyzeEntitiesRequest {
            document: Document {
                content: text,
                doc_type: "PLAIN_TEXT",
            },
            encoding_type: "UTF8",
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: AnalyzeEntitiesResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;

        Ok(body.entities.into_iter().map(Entity::from).collect())
    }

    fn name(&self) -> &str {
        "GoogleNaturalLanguage"
    }
}
