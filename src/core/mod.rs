// Core algorithm exports
pub mod matcher;
pub mod normalizer;
pub mod phrases;
pub mod scoring;
pub mod validate;

pub use matcher::{MatchingConfig, MatchingEngine, MatchingError, MAX_RADIUS_FACTOR};
pub use normalizer::{normalize_guidance, PreferenceDelta, TraitMapping};
pub use phrases::{PhraseKey, NEGATION_PAIRS};
pub use scoring::calculate_match_score;
pub use validate::{validate_matching_results, ValidationReport};
