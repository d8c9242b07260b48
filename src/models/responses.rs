use serde::{Deserialize, Serialize};

use crate::core::validate::ValidationReport;
use crate::models::domain::MatchingOutcome;

/// Response for the find-matches endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesResponse {
    #[serde(flatten)]
    pub outcome: MatchingOutcome,
    pub validation: ValidationReport,
    /// Size of the candidate pool before filtering
    #[serde(rename = "totalCandidates")]
    pub total_candidates: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

/// Response for the unsubscribe endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeResponse {
    pub success: bool,
    #[serde(rename = "alreadyProcessed")]
    pub already_processed: bool,
    pub message: String,
}
