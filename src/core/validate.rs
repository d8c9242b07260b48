use serde::{Deserialize, Serialize};

use crate::core::phrases::NEGATION_PAIRS;
use crate::models::{Dog, MatchingOutcome, UserPreferences};

/// Independent consistency check over a matching outcome.
///
/// Issues are correctness violations; warnings are soft quality signals.
/// Callers decide whether to serve degraded results — nothing here throws.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Re-check an outcome against the engine's invariants.
pub fn validate_matching_results(
    outcome: &MatchingOutcome,
    _preferences: &UserPreferences,
    candidates: &[Dog],
) -> ValidationReport {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    // Top tier must be a leading prefix of the full ordered list
    if outcome.top_matches.len() > outcome.all_matches.len() {
        issues.push("topMatches is larger than allMatches".to_string());
    } else {
        for (i, top) in outcome.top_matches.iter().enumerate() {
            if top.dog_id != outcome.all_matches[i].dog_id {
                issues.push(format!(
                    "topMatches diverges from allMatches at position {}",
                    i
                ));
                break;
            }
        }
    }

    // Scores bounded and ordered
    for result in &outcome.all_matches {
        if !(0.0..=100.0).contains(&result.score) {
            issues.push(format!(
                "score {} for {} is outside [0, 100]",
                result.score, result.dog_id
            ));
        }
    }
    for pair in outcome.all_matches.windows(2) {
        if pair[0].score < pair[1].score {
            issues.push(format!(
                "results are not sorted by descending score near {}",
                pair[1].dog_id
            ));
            break;
        }
    }

    // No candidate may appear twice
    let mut ids: Vec<&str> = outcome
        .all_matches
        .iter()
        .map(|m| m.dog_id.as_str())
        .collect();
    ids.sort_unstable();
    for pair in ids.windows(2) {
        if pair[0] == pair[1] {
            issues.push(format!("candidate {} appears more than once", pair[0]));
        }
    }

    // Unresolved contradictions: both sides of a negation pair on one result
    for result in &outcome.all_matches {
        for (matched, concern) in NEGATION_PAIRS {
            let has_match = result
                .reasons
                .iter()
                .any(|r| r.eq_ignore_ascii_case(matched.text()));
            let has_concern = result
                .concerns
                .iter()
                .any(|c| c.eq_ignore_ascii_case(concern.text()));
            if has_match && has_concern {
                issues.push(format!(
                    "unresolved contradiction for {}: \"{}\" vs \"{}\"",
                    result.dog_id,
                    matched.text(),
                    concern.text()
                ));
            }
        }
    }

    // Soft signals
    if !candidates.is_empty() && outcome.all_matches.is_empty() {
        warnings.push("no results despite a non-empty candidate pool".to_string());
    }
    if outcome.expansion_notes.len() >= 3 {
        warnings.push("search was heavily expanded to reach a viable result count".to_string());
    }
    let confidences: Vec<f64> = candidates
        .iter()
        .filter_map(|d| d.traits.average_confidence())
        .collect();
    if !confidences.is_empty() {
        let mean = confidences.iter().sum::<f64>() / confidences.len() as f64;
        if mean < 0.3 {
            warnings.push(format!(
                "inferred-trait confidence is unusually low (mean {:.2})",
                mean
            ));
        }
    }

    ValidationReport {
        is_valid: issues.is_empty(),
        issues,
        warnings,
    }
}
