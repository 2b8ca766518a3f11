//! Entity Extraction Strategy
//!
//! The gateway never analyzes text itself. An [`EntityExtractor`] forwards
//! the text to a vendor and returns every entity it found; this module then
//! keeps only the salient ones.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keyword_core::extractor::extract_keywords;
//!
//! let keywords = extract_keywords(extractor.as_ref(), "Barack Obama was born in Hawaii.").await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Entities at or below this salience are dropped.
pub const SALIENCE_THRESHOLD: f64 = 0.1;

/// An entity as reported by the extraction vendor
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Surface form (e.g., "Barack Obama")
    pub name: String,

    /// Vendor entity class (e.g., "PERSON", "LOCATION")
    #[serde(rename = "type")]
    pub entity_type: String,

    /// Importance within the document, in `[0, 1]`
    pub salience: f64,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>, salience: f64) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            salience,
        }
    }
}

/// A keyword returned to the caller: `{name, type, salience}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub salience: f64,
}

impl From<Entity> for Keyword {
    fn from(entity: Entity) -> Self {
        Self {
            name: entity.name,
            entity_type: entity.entity_type,
            salience: entity.salience,
        }
    }
}

/// Strategy trait for entity-extraction vendors
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    /// Analyze plain text and return every entity found
    async fn analyze_entities(&self, text: &str) -> Result<Vec<Entity>>;

    /// Vendor name, for logs
    fn name(&self) -> &str;
}

/// Keep entities with salience strictly above [`SALIENCE_THRESHOLD`], in vendor order.
pub fn select_keywords(entities: Vec<Entity>) -> Vec<Keyword> {
    entities
        .into_iter()
        .filter(|e| e.salience > SALIENCE_THRESHOLD)
        .map(Keyword::from)
        .collect()
}

/// Run the extractor and filter its output.
///
/// Callers validate `text` first; this always contacts the vendor.
pub async fn extract_keywords(extractor: &dyn EntityExtractor, text: &str) -> Result<Vec<Keyword>> {
    let entities = extractor.analyze_entities(text).await?;
    let total = entities.len();
    let keywords = select_keywords(entities);

    tracing::debug!(
        extractor = extractor.name(),
        total,
        kept = keywords.len(),
        "Filtered extracted entities"
    );

    Ok(keywords)
}

/// True when `text` has no non-whitespace character.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
