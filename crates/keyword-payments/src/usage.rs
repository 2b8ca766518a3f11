//! Free-Tier Usage Metering
//!
//! Counts extractions per Identity Record in the `freeUsageCount` metadata
//! key. Premium records are unmetered. The count is read, then written back
//! incremented; concurrent requests from one user can both pass the check.

use std::sync::Arc;

use keyword_core::{IdentityProvider, IdentityRecord, MetadataPatch, UserMetadata};
use serde::Serialize;

/// Default extractions allowed before payment
pub const DEFAULT_FREE_LIMIT: u32 = 10;

/// Metering verdict
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum UsageDecision {
    /// Entitled user, no metering
    Unlimited,
    /// Free use granted; `remaining` after this one
    Allowed { remaining: u32 },
    /// Free allowance used up
    Exhausted { limit: u32 },
}

impl UsageDecision {
    pub const fn is_allowed(self) -> bool {
        !matches!(self, Self::Exhausted { .. })
    }
}

/// Verdict for one more use against `limit`, without side effects
pub const fn decide(metadata: &UserMetadata, limit: u32) -> UsageDecision {
    if metadata.is_premium {
        return UsageDecision::Unlimited;
    }
    if metadata.free_usage_count >= limit {
        return UsageDecision::Exhausted { limit };
    }
    UsageDecision::Allowed {
        remaining: limit - metadata.free_usage_count - 1,
    }
}

pub struct UsageMeter {
    identity: Arc<dyn IdentityProvider>,
    free_limit: u32,
}

impl UsageMeter {
    pub fn new(identity: Arc<dyn IdentityProvider>, free_limit: u32) -> Self {
        Self {
            identity,
            free_limit,
        }
    }

    pub const fn free_limit(&self) -> u32 {
        self.free_limit
    }

    /// Verdict for one more use by `record`
    pub const fn check(&self, record: &IdentityRecord) -> UsageDecision {
        decide(&record.metadata, self.free_limit)
    }

    /// Count one metered use after it succeeded. Only `Allowed` verdicts
    /// are written; a failed write is logged and otherwise ignored.
    pub async fn record(&self, record: &IdentityRecord, decision: UsageDecision) {
        let UsageDecision::Allowed { remaining } = decision else {
            return;
        };

        let next = record.metadata.free_usage_count.saturating_add(1);
        match self
            .identity
            .update_metadata(&record.subject, &MetadataPatch::usage(next))
            .await
        {
            Ok(()) => {
                tracing::debug!(user_id = %record.subject, used = next, remaining, "Recorded free-tier usage");
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id = %record.subject, "Failed to record free-tier usage");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyword_core::mock::MemoryIdentityProvider;

    #[test]
    fn test_decide() {
        let mut metadata = UserMetadata::default();
        assert_eq!(decide(&metadata, 2), UsageDecision::Allowed { remaining: 1 });

        metadata.free_usage_count = 2;
        assert_eq!(decide(&metadata, 2), UsageDecision::Exhausted { limit: 2 });

        metadata.is_premium = true;
        assert_eq!(decide(&metadata, 2), UsageDecision::Unlimited);
    }

    #[tokio::test]
    async fn test_free_tier_runs_out() {
        let identity = Arc::new(MemoryIdentityProvider::new().with_record(IdentityRecord::new("user-1")));
        let meter = UsageMeter::new(identity.clone(), 3);

        // Should allow up to 3 requests
        for _ in 0..3 {
            let record = identity.record("user-1").unwrap();
            let decision = meter.check(&record);
            assert!(decision.is_allowed());
            meter.record(&record, decision).await;
        }

        // 4th should fail
        let record = identity.record("user-1").unwrap();
        let decision = meter.check(&record);
        assert_eq!(decision, UsageDecision::Exhausted { limit: 3 });
        meter.record(&record, decision).await;
        assert_eq!(identity.record("user-1").unwrap().metadata.free_usage_count, 3);
    }

    #[tokio::test]
    async fn test_premium_is_not_metered() {
        let identity = Arc::new(MemoryIdentityProvider::new().with_record(IdentityRecord::new("user-1").premium()));
        let meter = UsageMeter::new(identity.clone(), 0);

        let record = identity.record("user-1").unwrap();
        let decision = meter.check(&record);
        assert_eq!(decision, UsageDecision::Unlimited);
        meter.record(&record, decision).await;
        assert_eq!(identity.update_calls(), 0);
    }
}
