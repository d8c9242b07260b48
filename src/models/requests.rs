use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::models::domain::{Dog, UserPreferences};

/// Request to run the matching engine for a preference profile.
///
/// Candidates may be supplied inline (admin/testing); otherwise they are
/// fetched from the listing provider using the preference zip codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindMatchesRequest {
    pub preferences: UserPreferences,
    /// Free-text guidance, normalized into the preference profile
    #[serde(default)]
    pub guidance: Option<String>,
    /// Pre-extracted trait payload from the language-model pipeline;
    /// treated as untrusted and validated before merging
    #[serde(default)]
    pub extracted: Option<Value>,
    #[serde(default)]
    pub candidates: Option<Vec<Dog>>,
}

/// Query string for the unsubscribe link
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UnsubscribeQuery {
    #[validate(length(min = 1))]
    pub token: String,
}
