//! In-memory fakes
//!
//! For testing and local development. Both fakes count the calls that would
//! reach the vendor so tests can assert "no outbound call was made".

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{Result, VendorError};
use crate::extractor::{Entity, EntityExtractor};
use crate::identity::{IdentityProvider, IdentityRecord, MetadataPatch, UserProfile};

/// Extractor returning a fixed entity list
#[derive(Default)]
pub struct MockExtractor {
    entities: Vec<Entity>,
    fail: bool,
    calls: AtomicUsize,
}

impl MockExtractor {
    pub fn with_entities(entities: Vec<Entity>) -> Self {
        Self {
            entities,
            ..Default::default()
        }
    }

    /// Extractor whose every call fails like an unreachable vendor
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Number of `analyze_entities` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityExtractor for MockExtractor {
    async fn analyze_entities(&self, _text: &str) -> Result<Vec<Entity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(VendorError::ProviderUnavailable("mock extractor offline".into()));
        }
        Ok(self.entities.clone())
    }

    fn name(&self) -> &str {
        "MockExtractor"
    }
}

/// Identity provider keeping records in a map
#[derive(Default)]
pub struct MemoryIdentityProvider {
    records: Mutex<HashMap<String, IdentityRecord>>,
    tokens: Mutex<HashMap<String, String>>,
    fail_updates: AtomicBool,
    failing_subjects: Mutex<HashSet<String>>,
    update_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record and return `self` (builder style)
    pub fn with_record(self, record: IdentityRecord) -> Self {
        self.insert(record);
        self
    }

    /// Make `token` resolve to `subject`
    pub fn with_token(self, token: impl Into<String>, subject: impl Into<String>) -> Self {
        lock(&self.tokens).insert(token.into(), subject.into());
        self
    }

    pub fn insert(&self, record: IdentityRecord) {
        lock(&self.records).insert(record.subject.clone(), record);
    }

    /// Snapshot of a record
    pub fn record(&self, subject: &str) -> Option<IdentityRecord> {
        lock(&self.records).get(subject).cloned()
    }

    /// Make every later `update_metadata` call fail
    pub fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }

    /// Make later `update_metadata` calls for `subject` fail
    pub fn fail_updates_for(&self, subject: impl Into<String>) {
        lock(&self.failing_subjects).insert(subject.into());
    }

    /// Number of `update_metadata` calls so far, failed ones included
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn user_from_token(&self, token: &str) -> Result<UserProfile> {
        let subject = lock(&self.tokens)
            .get(token)
            .cloned()
            .ok_or_else(|| VendorError::Auth("unknown token".into()))?;

        self.get_record(&subject).await.map(|record| record.profile())
    }

    async fn get_record(&self, subject: &str) -> Result<IdentityRecord> {
        self.record(subject)
            .ok_or_else(|| VendorError::NotFound(format!("user {subject}")))
    }

    async fn update_metadata(&self, subject: &str, patch: &MetadataPatch) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) || lock(&self.failing_subjects).contains(subject) {
            return Err(VendorError::ProviderUnavailable("mock identity offline".into()));
        }

        let mut records = lock(&self.records);
        let record = records
            .get_mut(subject)
            .ok_or_else(|| VendorError::NotFound(format!("user {subject}")))?;
        record.metadata.apply(patch);
        Ok(())
    }

    async fn find_by_customer_id(&self, customer_id: &str) -> Result<Vec<IdentityRecord>> {
        Ok(lock(&self.records)
            .values()
            .filter(|r| r.metadata.customer_id() == Some(customer_id))
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "MemoryIdentity"
    }
}
