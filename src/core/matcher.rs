use thiserror::Error;

use crate::core::phrases::{PhraseKey, NEGATION_PAIRS};
use crate::core::scoring::calculate_match_score;
use crate::models::{Dog, MatchResult, MatchingOutcome, ScoringWeights, UserPreferences};

/// Structural errors only. "No good matches" is an outcome, never an error.
#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("invalid preferences: {0}")]
    InvalidPreferences(String),
}

/// Engine knobs
#[derive(Debug, Clone, Copy)]
pub struct MatchingConfig {
    /// Bound on the top tier
    pub top_n: usize,
    /// Pool size below which the search is progressively relaxed
    pub min_results: usize,
    /// Minimum score for the top tier
    pub top_score_floor: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            min_results: 3,
            top_score_floor: 55.0,
        }
    }
}

/// Relaxation steps, applied in this fixed order
#[derive(Debug, Clone, Copy)]
enum Relaxation {
    Radius(f64),
    Gender,
    Size,
    Age,
}

/// Widest radius multiplier the ladder can reach. Candidate fetches must
/// cover this much distance or the radius steps have nothing to add.
pub const MAX_RADIUS_FACTOR: f64 = 2.0;

const RELAXATION_LADDER: &[Relaxation] = &[
    Relaxation::Radius(1.5),
    Relaxation::Radius(MAX_RADIUS_FACTOR),
    Relaxation::Gender,
    Relaxation::Size,
    Relaxation::Age,
];

/// Active filter set for one scoring pass
struct FilterState {
    radius_mi: f64,
    gender: bool,
    size: bool,
    age: bool,
}

impl FilterState {
    fn passes(&self, dog: &Dog, preferences: &UserPreferences) -> bool {
        if let Some(distance) = dog.distance_mi {
            if distance > self.radius_mi {
                return false;
            }
        }
        if self.gender {
            if let (Some(wanted), Some(actual)) = (preferences.gender, dog.gender) {
                if wanted != actual {
                    return false;
                }
            }
        }
        if self.size && !preferences.sizes.is_empty() {
            if let Some(size) = dog.size {
                if !preferences.sizes.contains(&size) {
                    return false;
                }
            }
        }
        if self.age && !preferences.ages.is_empty() {
            if let Some(age) = dog.age {
                if !preferences.ages.contains(&age) {
                    return false;
                }
            }
        }
        true
    }
}

/// Deterministic matching engine.
///
/// # Pipeline
/// 1. Filter candidates by radius and the optional gender/size/age filters
/// 2. Relax filters in a fixed order until the pool is viable
/// 3. Score every pool member as a weighted sum of bounded criteria
/// 4. Resolve contradictory reason pairs, favoring the concern
/// 5. Sort by score descending, candidate id ascending
/// 6. Partition into top matches and the full ordered list
#[derive(Debug, Clone)]
pub struct MatchingEngine {
    weights: ScoringWeights,
    config: MatchingConfig,
}

impl MatchingEngine {
    pub fn new(weights: ScoringWeights, config: MatchingConfig) -> Self {
        Self { weights, config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ScoringWeights::default(), MatchingConfig::default())
    }

    /// Run the full pipeline for one preference profile.
    pub fn run(
        &self,
        preferences: &UserPreferences,
        candidates: &[Dog],
    ) -> Result<MatchingOutcome, MatchingError> {
        preferences
            .validate_shape()
            .map_err(MatchingError::InvalidPreferences)?;

        let mut filters = FilterState {
            radius_mi: preferences.radius_mi,
            gender: true,
            size: true,
            age: true,
        };
        let mut expansion_notes = Vec::new();

        let mut pool: Vec<&Dog> = candidates
            .iter()
            .filter(|d| filters.passes(d, preferences))
            .collect();

        for step in RELAXATION_LADDER {
            if pool.len() >= self.config.min_results || pool.len() == candidates.len() {
                break;
            }
            match step {
                Relaxation::Radius(factor) => {
                    let widened = preferences.radius_mi * factor;
                    expansion_notes.push(format!(
                        "Expanded search radius from {:.0} to {:.0} miles",
                        filters.radius_mi, widened
                    ));
                    filters.radius_mi = widened;
                }
                Relaxation::Gender => {
                    if preferences.gender.is_none() || !filters.gender {
                        continue;
                    }
                    filters.gender = false;
                    expansion_notes
                        .push("Included all genders to find more matches".to_string());
                }
                Relaxation::Size => {
                    if preferences.sizes.is_empty() || !filters.size {
                        continue;
                    }
                    filters.size = false;
                    expansion_notes
                        .push("Relaxed size preference to find more matches".to_string());
                }
                Relaxation::Age => {
                    if preferences.ages.is_empty() || !filters.age {
                        continue;
                    }
                    filters.age = false;
                    expansion_notes
                        .push("Relaxed age preference to find more matches".to_string());
                }
            }
            pool = candidates
                .iter()
                .filter(|d| filters.passes(d, preferences))
                .collect();
        }

        let mut all_matches: Vec<MatchResult> = pool
            .iter()
            .map(|dog| self.score_one(dog, preferences))
            .collect();

        // Score descending, candidate id as the stable tiebreak
        all_matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.dog_id.cmp(&b.dog_id))
        });

        let top_count = all_matches
            .iter()
            .take(self.config.top_n)
            .take_while(|m| m.score >= self.config.top_score_floor)
            .count();
        let top_matches = all_matches[..top_count].to_vec();

        if all_matches.is_empty() {
            expansion_notes.push(if candidates.is_empty() {
                "No candidates were available for this search".to_string()
            } else {
                "No candidates matched your filters, even after expansion".to_string()
            });
        }

        Ok(MatchingOutcome {
            top_matches,
            all_matches,
            expansion_notes,
        })
    }

    fn score_one(&self, dog: &Dog, preferences: &UserPreferences) -> MatchResult {
        let scored = calculate_match_score(dog, preferences, &self.weights);

        let mut reasons = scored.reasons;
        let concerns = scored.concerns;
        resolve_contradictions(&mut reasons, &concerns);

        MatchResult {
            dog_id: dog.id.clone(),
            name: dog.name.clone(),
            score: scored.score,
            reasons: render_unique(&reasons),
            concerns: render_unique(&concerns),
            shared_traits: scored.shared_traits,
            distance_mi: dog.distance_mi,
        }
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Drop match claims that are negated by a present concern. The concern is
/// the more conservative claim, so it always wins.
fn resolve_contradictions(reasons: &mut Vec<PhraseKey>, concerns: &[PhraseKey]) {
    reasons.retain(|reason| {
        !NEGATION_PAIRS
            .iter()
            .any(|(matched, concern)| matched == reason && concerns.contains(concern))
    });
}

/// Render phrase keys, deduplicating case-insensitively in first-seen order
fn render_unique(keys: &[PhraseKey]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for key in keys {
        let text = key.text();
        let folded = text.to_lowercase();
        if !seen.contains(&folded) {
            seen.push(folded);
            out.push(text.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AgeClass, DogBreeds, Gender, InferredTraits, Lifestyle, SizeClass, TraitSignal,
    };

    fn candidate(id: &str, size: SizeClass, age: AgeClass, distance: f64) -> Dog {
        Dog {
            id: id.to_string(),
            name: format!("Dog {}", id),
            breeds: DogBreeds::default(),
            age: Some(age),
            size: Some(size),
            gender: Some(Gender::Female),
            energy: None,
            temperament: vec![],
            description: None,
            distance_mi: Some(distance),
            published_at: None,
            url: None,
            organization: None,
            traits: InferredTraits::default(),
        }
    }

    fn preferences() -> UserPreferences {
        UserPreferences {
            zip_codes: vec!["10001".to_string()],
            radius_mi: 50.0,
            sizes: vec![SizeClass::Large],
            ages: vec![AgeClass::Adult],
            gender: None,
            temperament: vec![],
            lifestyle: Lifestyle::default(),
        }
    }

    #[test]
    fn test_rejects_invalid_preferences() {
        let engine = MatchingEngine::with_defaults();
        let mut prefs = preferences();
        prefs.zip_codes.clear();
        let err = engine.run(&prefs, &[]).unwrap_err();
        assert!(matches!(err, MatchingError::InvalidPreferences(_)));
    }

    #[test]
    fn test_empty_candidates_is_an_outcome_not_an_error() {
        let engine = MatchingEngine::with_defaults();
        let outcome = engine.run(&preferences(), &[]).unwrap();
        assert!(outcome.all_matches.is_empty());
        assert!(!outcome.expansion_notes.is_empty());
    }

    #[test]
    fn test_sorted_descending_with_id_tiebreak() {
        let engine = MatchingEngine::with_defaults();
        let candidates = vec![
            candidate("b", SizeClass::Large, AgeClass::Adult, 5.0),
            candidate("a", SizeClass::Large, AgeClass::Adult, 5.0),
            candidate("c", SizeClass::Large, AgeClass::Adult, 30.0),
        ];
        let outcome = engine.run(&preferences(), &candidates).unwrap();
        let ids: Vec<&str> = outcome.all_matches.iter().map(|m| m.dog_id.as_str()).collect();
        // a and b tie on score, id breaks the tie; c is further away
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_top_is_prefix_of_all() {
        let engine = MatchingEngine::with_defaults();
        let candidates: Vec<Dog> = (0..10)
            .map(|i| {
                candidate(
                    &format!("{:02}", i),
                    SizeClass::Large,
                    AgeClass::Adult,
                    1.0 + i as f64 * 4.0,
                )
            })
            .collect();
        let outcome = engine.run(&preferences(), &candidates).unwrap();
        assert!(outcome.top_matches.len() <= 5);
        for (i, top) in outcome.top_matches.iter().enumerate() {
            assert_eq!(top.dog_id, outcome.all_matches[i].dog_id);
        }
    }

    #[test]
    fn test_expansion_relaxes_radius_first() {
        let engine = MatchingEngine::with_defaults();
        // Everything is outside the base radius but inside 2x
        let candidates = vec![
            candidate("a", SizeClass::Large, AgeClass::Adult, 60.0),
            candidate("b", SizeClass::Large, AgeClass::Adult, 70.0),
            candidate("c", SizeClass::Large, AgeClass::Adult, 90.0),
        ];
        let outcome = engine.run(&preferences(), &candidates).unwrap();
        assert_eq!(outcome.all_matches.len(), 3);
        assert!(outcome.expansion_notes[0].contains("radius"));
        // Out-of-original-radius candidates carry the concern
        assert!(outcome.all_matches[0]
            .concerns
            .iter()
            .any(|c| c.contains("outside your search radius")));
    }

    #[test]
    fn test_expansion_order_is_fixed() {
        let engine = MatchingEngine::with_defaults();
        let mut prefs = preferences();
        prefs.gender = Some(Gender::Male);
        // Nothing passes size/age/gender; expansion must walk the ladder
        let candidates = vec![
            candidate("a", SizeClass::Small, AgeClass::Baby, 10.0),
            candidate("b", SizeClass::Small, AgeClass::Baby, 12.0),
        ];
        let outcome = engine.run(&prefs, &candidates).unwrap();
        let notes = outcome.expansion_notes.join(" | ");
        let radius_at = notes.find("radius").unwrap();
        let gender_at = notes.find("genders").unwrap();
        let size_at = notes.find("size preference").unwrap();
        assert!(radius_at < gender_at && gender_at < size_at);
    }

    #[test]
    fn test_contradiction_prefers_concern() {
        let engine = MatchingEngine::with_defaults();
        let mut dog = candidate("a", SizeClass::Large, AgeClass::Adult, 5.0);
        dog.temperament = vec!["quiet".to_string()];
        dog.traits.barky = Some(TraitSignal {
            value: true,
            evidence: "frequent barking noted by shelter".to_string(),
            confidence: 0.9,
        });
        let outcome = engine.run(&preferences(), &[dog]).unwrap();
        let result = &outcome.all_matches[0];
        assert!(result.concerns.iter().any(|c| c == "known to be vocal"));
        assert!(!result.reasons.iter().any(|r| r == "quiet around the house"));
    }

    #[test]
    fn test_deterministic_output() {
        let engine = MatchingEngine::with_defaults();
        let candidates: Vec<Dog> = (0..20)
            .map(|i| {
                candidate(
                    &format!("{:02}", i),
                    if i % 2 == 0 { SizeClass::Large } else { SizeClass::Medium },
                    AgeClass::Adult,
                    1.0 + i as f64 * 2.0,
                )
            })
            .collect();
        let a = engine.run(&preferences(), &candidates).unwrap();
        let b = engine.run(&preferences(), &candidates).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
