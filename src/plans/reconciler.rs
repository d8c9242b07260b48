//! Reconciliation of locally stored plans against the billing provider.
//!
//! The provider is authoritative. Reconciliation detects drift, optionally
//! rewrites local records, and reports what it found. Per-record provider
//! failures never abort a batch; they are collected for the report.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::models::{
    ConsistencyReport, Mismatch, MismatchField, PlanRecord, RemoteSubscription, SyncFailure,
    SyncReport,
};

#[derive(Debug, Error)]
#[error("plan store error: {0}")]
pub struct StoreError(pub String);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("subscription not found: {0}")]
    NotFound(String),

    #[error("invalid provider payload: {0}")]
    InvalidPayload(String),
}

/// Persisted plan records, keyed by user
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// All records with a non-null billing subscription id
    async fn plans_with_subscription(&self) -> Result<Vec<PlanRecord>, StoreError>;

    /// Overwrite local status/period fields with the provider's values
    async fn apply_remote_state(
        &self,
        user_id: &str,
        remote: &RemoteSubscription,
        synced_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Authoritative subscription state, keyed by subscription id
#[async_trait]
pub trait BillingProvider: Send + Sync {
    async fn subscription(&self, subscription_id: &str)
        -> Result<RemoteSubscription, ProviderError>;
}

/// One checked record with everything the reports need
struct CheckedRecord {
    record: PlanRecord,
    remote: RemoteSubscription,
    mismatches: Vec<Mismatch>,
}

struct BatchCheck {
    checked: usize,
    records: Vec<CheckedRecord>,
    failures: Vec<SyncFailure>,
    unknown_statuses: Vec<(String, String)>,
}

pub struct PlanReconciler<S, B> {
    store: Arc<S>,
    billing: Arc<B>,
    tolerance: Duration,
}

impl<S: PlanStore, B: BillingProvider> PlanReconciler<S, B> {
    pub fn new(store: Arc<S>, billing: Arc<B>, tolerance_secs: i64) -> Self {
        Self {
            store,
            billing,
            tolerance: Duration::seconds(tolerance_secs),
        }
    }

    /// Detect drift between local records and the provider. Ordered by the
    /// store's record order; per-record provider failures are skipped here
    /// and surface through `validate_consistency`.
    pub async fn find_mismatches(&self) -> Result<Vec<Mismatch>, StoreError> {
        let batch = self.check_all().await?;
        Ok(batch
            .records
            .into_iter()
            .flat_map(|c| c.mismatches)
            .collect())
    }

    /// Corrective pass: adopt the provider's values for every drifted
    /// record. Idempotent; a second run with no remote change updates
    /// nothing.
    pub async fn sync_all_plans(&self) -> Result<SyncReport, StoreError> {
        let batch = self.check_all().await?;
        let checked = batch.checked;
        let mut failures = batch.failures;
        let mut updated = 0usize;

        for checked_record in &batch.records {
            if checked_record.mismatches.is_empty() {
                continue;
            }
            let user_id = &checked_record.record.user_id;
            match self
                .store
                .apply_remote_state(user_id, &checked_record.remote, Utc::now())
                .await
            {
                Ok(()) => {
                    updated += 1;
                    tracing::info!(
                        "synced plan for {} ({} drifted fields)",
                        user_id,
                        checked_record.mismatches.len()
                    );
                }
                Err(e) => {
                    tracing::error!("failed to apply remote state for {}: {}", user_id, e);
                    failures.push(SyncFailure {
                        user_id: user_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(SyncReport {
            checked,
            updated,
            failed: failures.len(),
            failures,
        })
    }

    /// Read-only pass producing a structured report without mutation.
    pub async fn validate_consistency(&self) -> Result<ConsistencyReport, StoreError> {
        let batch = self.check_all().await?;
        Ok(ConsistencyReport {
            checked: batch.checked,
            mismatches: batch
                .records
                .into_iter()
                .flat_map(|c| c.mismatches)
                .collect(),
            failures: batch.failures,
            unknown_statuses: batch.unknown_statuses,
        })
    }

    async fn check_all(&self) -> Result<BatchCheck, StoreError> {
        let plans = self.store.plans_with_subscription().await?;
        let mut batch = BatchCheck {
            checked: 0,
            records: Vec::new(),
            failures: Vec::new(),
            unknown_statuses: Vec::new(),
        };

        for record in plans {
            let Some(subscription_id) = record.stripe_subscription_id.clone() else {
                continue;
            };
            batch.checked += 1;

            let remote = match self.billing.subscription(&subscription_id).await {
                Ok(remote) => remote,
                Err(e) => {
                    // Isolate and continue: one bad lookup must not sink
                    // the batch
                    tracing::warn!(
                        "billing lookup failed for {} ({}): {}",
                        record.user_id,
                        subscription_id,
                        e
                    );
                    batch.failures.push(SyncFailure {
                        user_id: record.user_id.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !remote.status_known {
                batch
                    .unknown_statuses
                    .push((record.user_id.clone(), remote.raw_status.clone()));
            }

            let mismatches = self.compare(&record, &remote);
            batch.records.push(CheckedRecord {
                record,
                remote,
                mismatches,
            });
        }

        Ok(batch)
    }

    fn compare(&self, record: &PlanRecord, remote: &RemoteSubscription) -> Vec<Mismatch> {
        let mut mismatches = Vec::new();

        if record.status != remote.status {
            mismatches.push(Mismatch {
                user_id: record.user_id.clone(),
                field: MismatchField::Status,
                local: record.status.to_string(),
                remote: remote.status.to_string(),
            });
        }

        // Clock skew between systems is expected; only drift beyond the
        // tolerance counts
        match (record.current_period_end, remote.current_period_end) {
            (Some(local), Some(remote_end)) => {
                if (local - remote_end).abs() > self.tolerance {
                    mismatches.push(Mismatch {
                        user_id: record.user_id.clone(),
                        field: MismatchField::PeriodEnd,
                        local: local.to_rfc3339(),
                        remote: remote_end.to_rfc3339(),
                    });
                }
            }
            (None, Some(remote_end)) => {
                mismatches.push(Mismatch {
                    user_id: record.user_id.clone(),
                    field: MismatchField::PeriodEnd,
                    local: "none".to_string(),
                    remote: remote_end.to_rfc3339(),
                });
            }
            (Some(local), None) => {
                mismatches.push(Mismatch {
                    user_id: record.user_id.clone(),
                    field: MismatchField::PeriodEnd,
                    local: local.to_rfc3339(),
                    remote: "none".to_string(),
                });
            }
            (None, None) => {}
        }

        mismatches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PlanStatus, PlanTier};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub(crate) fn plan(user_id: &str, sub_id: &str, status: PlanStatus) -> PlanRecord {
        PlanRecord {
            user_id: user_id.to_string(),
            tier: PlanTier::Pro,
            stripe_customer_id: Some(format!("cus_{}", user_id)),
            stripe_subscription_id: Some(sub_id.to_string()),
            status,
            current_period_start: None,
            current_period_end: Some(Utc::now()),
            last_synced_at: None,
        }
    }

    pub(crate) fn remote(id: &str, status: &str, period_end: i64) -> RemoteSubscription {
        RemoteSubscription::from_value(&json!({
            "id": id,
            "status": status,
            "current_period_end": period_end,
            "metadata": {}
        }))
        .unwrap()
    }

    struct MemoryStore {
        plans: Mutex<Vec<PlanRecord>>,
    }

    #[async_trait]
    impl PlanStore for MemoryStore {
        async fn plans_with_subscription(&self) -> Result<Vec<PlanRecord>, StoreError> {
            Ok(self.plans.lock().unwrap().clone())
        }

        async fn apply_remote_state(
            &self,
            user_id: &str,
            remote: &RemoteSubscription,
            synced_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            let mut plans = self.plans.lock().unwrap();
            let record = plans
                .iter_mut()
                .find(|p| p.user_id == user_id)
                .ok_or_else(|| StoreError(format!("no plan for {}", user_id)))?;
            record.status = remote.status.clone();
            record.current_period_start = remote.current_period_start;
            record.current_period_end = remote.current_period_end;
            record.last_synced_at = Some(synced_at);
            Ok(())
        }
    }

    struct MemoryBilling {
        subscriptions: HashMap<String, RemoteSubscription>,
    }

    #[async_trait]
    impl BillingProvider for MemoryBilling {
        async fn subscription(
            &self,
            subscription_id: &str,
        ) -> Result<RemoteSubscription, ProviderError> {
            self.subscriptions
                .get(subscription_id)
                .cloned()
                .ok_or_else(|| ProviderError::NotFound(subscription_id.to_string()))
        }
    }

    fn reconciler(
        plans: Vec<PlanRecord>,
        subs: Vec<RemoteSubscription>,
    ) -> PlanReconciler<MemoryStore, MemoryBilling> {
        let store = Arc::new(MemoryStore {
            plans: Mutex::new(plans),
        });
        let billing = Arc::new(MemoryBilling {
            subscriptions: subs.into_iter().map(|s| (s.id.clone(), s)).collect(),
        });
        PlanReconciler::new(store, billing, 3600)
    }

    #[tokio::test]
    async fn test_status_drift_is_a_mismatch() {
        let period_end = Utc::now().timestamp();
        let mut local = plan("u1", "sub_1", PlanStatus::Active);
        local.current_period_end = DateTime::from_timestamp(period_end, 0);
        let r = reconciler(vec![local], vec![remote("sub_1", "past_due", period_end)]);

        let mismatches = r.find_mismatches().await.unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, MismatchField::Status);
        assert_eq!(mismatches[0].remote, "past_due");
    }

    #[tokio::test]
    async fn test_one_hour_period_drift_is_within_tolerance() {
        let period_end = Utc::now().timestamp();
        let mut local = plan("u1", "sub_1", PlanStatus::Active);
        local.current_period_end = DateTime::from_timestamp(period_end, 0);
        let r = reconciler(
            vec![local],
            vec![remote("sub_1", "active", period_end + 3600)],
        );
        assert!(r.find_mismatches().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_period_cleared_is_drift() {
        let local = plan("u1", "sub_1", PlanStatus::Active);
        // plan() sets a local period end; the provider reports none
        let bare_remote = RemoteSubscription::from_value(&json!({
            "id": "sub_1",
            "status": "active",
        }))
        .unwrap();
        let r = reconciler(vec![local], vec![bare_remote]);

        let mismatches = r.find_mismatches().await.unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].field, MismatchField::PeriodEnd);
        assert_eq!(mismatches[0].remote, "none");

        // Sync adopts the cleared value and converges
        let report = r.sync_all_plans().await.unwrap();
        assert_eq!(report.updated, 1);
        assert!(r.find_mismatches().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_converges() {
        let period_end = Utc::now().timestamp();
        let mut local = plan("u1", "sub_1", PlanStatus::Active);
        local.current_period_end = DateTime::from_timestamp(period_end, 0);
        let r = reconciler(vec![local], vec![remote("sub_1", "past_due", period_end)]);

        let first = r.sync_all_plans().await.unwrap();
        assert_eq!(first.updated, 1);

        // Second run finds nothing left to fix
        assert!(r.find_mismatches().await.unwrap().is_empty());
        let second = r.sync_all_plans().await.unwrap();
        assert_eq!(second.updated, 0);
    }

    #[tokio::test]
    async fn test_provider_failure_is_isolated() {
        let period_end = Utc::now().timestamp();
        let mut healthy = plan("u1", "sub_1", PlanStatus::Active);
        healthy.current_period_end = DateTime::from_timestamp(period_end, 0);
        let broken = plan("u2", "sub_missing", PlanStatus::Active);

        let r = reconciler(
            vec![healthy, broken],
            vec![remote("sub_1", "past_due", period_end)],
        );
        let report = r.sync_all_plans().await.unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].user_id, "u2");
    }

    #[tokio::test]
    async fn test_unknown_status_passes_through_flagged() {
        let period_end = Utc::now().timestamp();
        let mut local = plan("u1", "sub_1", PlanStatus::Active);
        local.current_period_end = DateTime::from_timestamp(period_end, 0);
        let r = reconciler(
            vec![local],
            vec![remote("sub_1", "paused", period_end)],
        );

        let report = r.validate_consistency().await.unwrap();
        assert_eq!(report.unknown_statuses, vec![("u1".to_string(), "paused".to_string())]);
        // The unknown status still counts as drift and syncs through
        let sync = r.sync_all_plans().await.unwrap();
        assert_eq!(sync.updated, 1);
        assert!(r.find_mismatches().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validate_does_not_mutate() {
        let period_end = Utc::now().timestamp();
        let mut local = plan("u1", "sub_1", PlanStatus::Active);
        local.current_period_end = DateTime::from_timestamp(period_end, 0);
        let r = reconciler(vec![local], vec![remote("sub_1", "past_due", period_end)]);

        let report = r.validate_consistency().await.unwrap();
        assert!(!report.is_consistent());
        // Still drifted afterwards
        assert_eq!(r.find_mismatches().await.unwrap().len(), 1);
    }
}
