use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Subscription tier a user is on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    #[serde(untagged)]
    Other(String),
}

impl PlanTier {
    pub fn as_str(&self) -> &str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Other(raw) => raw,
        }
    }
}

impl From<&str> for PlanTier {
    fn from(s: &str) -> Self {
        match s {
            "free" => PlanTier::Free,
            "pro" => PlanTier::Pro,
            other => PlanTier::Other(other.to_string()),
        }
    }
}

/// Canonical subscription status.
///
/// Provider statuses map through a fixed table; anything the table does not
/// know passes through as `Other` and is flagged in reconciliation reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStatus {
    Active,
    PastDue,
    Cancelled,
    Trialing,
    Incomplete,
    Unpaid,
    Other(String),
}

impl PlanStatus {
    /// Fixed billing-provider → canonical mapping. The bool is false for
    /// statuses the table does not recognise.
    pub fn from_provider(raw: &str) -> (Self, bool) {
        match raw {
            "active" => (PlanStatus::Active, true),
            "past_due" => (PlanStatus::PastDue, true),
            "canceled" => (PlanStatus::Cancelled, true),
            "trialing" => (PlanStatus::Trialing, true),
            "incomplete" => (PlanStatus::Incomplete, true),
            "unpaid" => (PlanStatus::Unpaid, true),
            other => (PlanStatus::Other(other.to_string()), false),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::PastDue => "past_due",
            PlanStatus::Cancelled => "cancelled",
            PlanStatus::Trialing => "trialing",
            PlanStatus::Incomplete => "incomplete",
            PlanStatus::Unpaid => "unpaid",
            PlanStatus::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for PlanStatus {
    fn from(s: &str) -> Self {
        match s {
            "active" => PlanStatus::Active,
            "past_due" => PlanStatus::PastDue,
            "cancelled" => PlanStatus::Cancelled,
            "trialing" => PlanStatus::Trialing,
            "incomplete" => PlanStatus::Incomplete,
            "unpaid" => PlanStatus::Unpaid,
            other => PlanStatus::Other(other.to_string()),
        }
    }
}

impl Serialize for PlanStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PlanStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(PlanStatus::from(s.as_str()))
    }
}

/// Locally persisted subscription state for one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRecord {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub tier: PlanTier,
    #[serde(rename = "stripeCustomerId")]
    pub stripe_customer_id: Option<String>,
    #[serde(rename = "stripeSubscriptionId")]
    pub stripe_subscription_id: Option<String>,
    pub status: PlanStatus,
    #[serde(rename = "currentPeriodStart")]
    pub current_period_start: Option<DateTime<Utc>>,
    #[serde(rename = "currentPeriodEnd")]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(rename = "lastSyncedAt")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Billing-provider subscription, validated out of a duck-typed payload
/// before the reconciler inspects any field.
#[derive(Debug, Clone)]
pub struct RemoteSubscription {
    pub id: String,
    /// Raw provider status string
    pub raw_status: String,
    pub status: PlanStatus,
    pub status_known: bool,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub trial_end: Option<DateTime<Utc>>,
    pub metadata: Value,
}

impl RemoteSubscription {
    /// Parse an untyped provider payload. Missing `id` or `status` is a
    /// malformed payload; missing period fields are tolerated.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or("subscription payload missing id")?
            .to_string();
        let raw_status = value
            .get("status")
            .and_then(Value::as_str)
            .ok_or("subscription payload missing status")?
            .to_string();
        let (status, status_known) = PlanStatus::from_provider(&raw_status);

        Ok(Self {
            id,
            status,
            status_known,
            raw_status,
            current_period_start: epoch_field(value, "current_period_start"),
            current_period_end: epoch_field(value, "current_period_end"),
            trial_end: epoch_field(value, "trial_end"),
            metadata: value.get("metadata").cloned().unwrap_or(Value::Null),
        })
    }
}

fn epoch_field(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    value
        .get(key)
        .and_then(Value::as_i64)
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

/// Which field drifted between the local record and the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchField {
    Status,
    PeriodEnd,
}

/// One detected drift between local and remote state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mismatch {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub field: MismatchField,
    pub local: String,
    pub remote: String,
}

/// A record that could not be checked or updated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFailure {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub reason: String,
}

/// Outcome of a corrective sync pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub checked: usize,
    pub updated: usize,
    pub failed: usize,
    pub failures: Vec<SyncFailure>,
}

/// Read-only consistency report for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyReport {
    pub checked: usize,
    pub mismatches: Vec<Mismatch>,
    pub failures: Vec<SyncFailure>,
    /// user_id, raw provider status pairs the mapping table did not know
    #[serde(rename = "unknownStatuses")]
    pub unknown_statuses: Vec<(String, String)>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty() && self.failures.is_empty()
    }
}
