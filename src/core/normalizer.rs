//! Table-driven normalization of free-text adopter guidance into the
//! canonical preference schema.
//!
//! A trait is asserted only when the text supports it directly; anything
//! ambiguous or unmentioned is omitted, never guessed. Every applied mapping
//! lands in an audit trail, even when the result is empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ActivityLevel, AgeClass, SizeClass, UserPreferences};

const SIZE_SYNONYMS: &[(&str, SizeClass)] = &[
    ("tiny", SizeClass::Small),
    ("small", SizeClass::Small),
    ("little", SizeClass::Small),
    ("lap dog", SizeClass::Small),
    ("medium", SizeClass::Medium),
    ("mid-size", SizeClass::Medium),
    ("big", SizeClass::Large),
    ("large", SizeClass::Large),
    ("giant", SizeClass::Xl),
    ("huge", SizeClass::Xl),
    ("extra large", SizeClass::Xl),
];

const AGE_SYNONYMS: &[(&str, AgeClass)] = &[
    ("puppy", AgeClass::Baby),
    ("baby", AgeClass::Baby),
    ("young", AgeClass::Young),
    ("adolescent", AgeClass::Young),
    ("adult", AgeClass::Adult),
    ("grown", AgeClass::Adult),
    ("senior", AgeClass::Senior),
    ("older dog", AgeClass::Senior),
];

const ENERGY_SYNONYMS: &[(&str, ActivityLevel)] = &[
    ("chill", ActivityLevel::Low),
    ("calm", ActivityLevel::Low),
    ("laid-back", ActivityLevel::Low),
    ("laid back", ActivityLevel::Low),
    ("mellow", ActivityLevel::Low),
    ("low key", ActivityLevel::Low),
    ("low-key", ActivityLevel::Low),
    ("moderately active", ActivityLevel::Moderate),
    ("active", ActivityLevel::High),
    ("energetic", ActivityLevel::High),
    ("high energy", ActivityLevel::High),
    ("running partner", ActivityLevel::High),
    ("hiking", ActivityLevel::High),
];

const TEMPERAMENT_SYNONYMS: &[(&str, &str)] = &[
    ("quiet", "quiet"),
    ("doesn't bark", "quiet"),
    ("not barky", "quiet"),
    ("friendly", "friendly"),
    ("social", "friendly"),
    ("playful", "playful"),
    ("gentle", "gentle"),
    ("good with dogs", "good with dogs"),
    ("likes other dogs", "good with dogs"),
    ("good with cats", "good with cats"),
];

/// Canonical temperament tags an untrusted payload may assert
const KNOWN_TEMPERAMENT_TAGS: &[&str] =
    &["quiet", "friendly", "playful", "gentle", "good with dogs", "good with cats"];

/// One applied text → schema mapping, kept for auditability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitMapping {
    pub phrase: String,
    pub category: String,
    pub value: String,
}

/// Structured delta extracted from guidance text or an upstream extractor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferenceDelta {
    #[serde(default)]
    pub ages: Vec<AgeClass>,
    #[serde(default)]
    pub sizes: Vec<SizeClass>,
    #[serde(default)]
    pub energy: Option<ActivityLevel>,
    #[serde(default)]
    pub temperament: Vec<String>,
    /// Always present, even when empty
    #[serde(default)]
    pub mappings: Vec<TraitMapping>,
}

impl PreferenceDelta {
    /// Build a delta from an upstream (LLM) extraction payload. The payload
    /// is untrusted: unknown categories and unmappable values are dropped.
    pub fn from_untrusted(value: &Value) -> Self {
        let mut delta = Self::default();

        for raw in str_items(value, "ages") {
            let age = match raw.as_str() {
                "baby" | "puppy" => Some(AgeClass::Baby),
                "young" => Some(AgeClass::Young),
                "adult" => Some(AgeClass::Adult),
                "senior" => Some(AgeClass::Senior),
                _ => None,
            };
            if let Some(age) = age {
                push_unique(&mut delta.ages, age);
                delta.record(&raw, "age", &format!("{:?}", age));
            }
        }

        for raw in str_items(value, "sizes") {
            let size = match raw.as_str() {
                "small" => Some(SizeClass::Small),
                "medium" => Some(SizeClass::Medium),
                "large" => Some(SizeClass::Large),
                "xl" | "xlarge" | "extra large" => Some(SizeClass::Xl),
                _ => None,
            };
            if let Some(size) = size {
                push_unique(&mut delta.sizes, size);
                delta.record(&raw, "size", &format!("{:?}", size));
            }
        }

        if let Some(raw) = value.get("energy").and_then(Value::as_str) {
            let energy = match raw.to_lowercase().as_str() {
                "low" => Some(ActivityLevel::Low),
                "moderate" | "medium" => Some(ActivityLevel::Moderate),
                "high" => Some(ActivityLevel::High),
                _ => None,
            };
            if let Some(energy) = energy {
                delta.energy = Some(energy);
                delta.record(raw, "energy", &format!("{:?}", energy));
            }
        }

        for raw in str_items(value, "temperament") {
            if KNOWN_TEMPERAMENT_TAGS.contains(&raw.as_str()) {
                if !delta.temperament.iter().any(|t| t == &raw) {
                    delta.temperament.push(raw.clone());
                    delta.record(&raw, "temperament", &raw);
                }
            }
        }

        delta
    }

    /// Merge this delta into a preference profile. Explicitly set filters
    /// are never clobbered; guidance only fills gaps and adds temperament.
    pub fn apply(&self, preferences: &mut UserPreferences) {
        if preferences.ages.is_empty() {
            preferences.ages = self.ages.clone();
        }
        if preferences.sizes.is_empty() {
            preferences.sizes = self.sizes.clone();
        }
        if preferences.lifestyle.activity.is_none() {
            preferences.lifestyle.activity = self.energy;
        }
        for tag in &self.temperament {
            if !preferences
                .temperament
                .iter()
                .any(|t| t.eq_ignore_ascii_case(tag))
            {
                preferences.temperament.push(tag.clone());
            }
        }
    }

    fn record(&mut self, phrase: &str, category: &str, value: &str) {
        self.mappings.push(TraitMapping {
            phrase: phrase.to_string(),
            category: category.to_string(),
            value: value.to_string(),
        });
    }
}

/// Map free-text guidance into a structured delta using the synonym tables.
pub fn normalize_guidance(text: &str) -> PreferenceDelta {
    let lowered = text.to_lowercase();
    let mut delta = PreferenceDelta::default();

    for (phrase, size) in SIZE_SYNONYMS {
        if lowered.contains(phrase) {
            push_unique(&mut delta.sizes, *size);
            delta.record(phrase, "size", &format!("{:?}", size));
        }
    }

    for (phrase, age) in AGE_SYNONYMS {
        if lowered.contains(phrase) {
            push_unique(&mut delta.ages, *age);
            delta.record(phrase, "age", &format!("{:?}", age));
        }
    }

    // Energy is a single slot: conflicting evidence means no assertion
    let mut energy_hits: Vec<ActivityLevel> = Vec::new();
    for (phrase, level) in ENERGY_SYNONYMS {
        if lowered.contains(phrase) {
            push_unique(&mut energy_hits, *level);
            delta.record(phrase, "energy", &format!("{:?}", level));
        }
    }
    if energy_hits.len() == 1 {
        delta.energy = Some(energy_hits[0]);
    }

    for (phrase, tag) in TEMPERAMENT_SYNONYMS {
        if lowered.contains(phrase) {
            if !delta.temperament.iter().any(|t| t == tag) {
                delta.temperament.push(tag.to_string());
            }
            delta.record(phrase, "temperament", tag);
        }
    }

    delta
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn str_items(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lifestyle;
    use serde_json::json;

    #[test]
    fn test_size_synonyms() {
        let delta = normalize_guidance("we'd love a big dog, maybe even a giant one");
        assert!(delta.sizes.contains(&SizeClass::Large));
        assert!(delta.sizes.contains(&SizeClass::Xl));
        assert!(!delta.mappings.is_empty());
    }

    #[test]
    fn test_energy_requires_unambiguous_support() {
        let calm = normalize_guidance("looking for a chill, laid-back buddy");
        assert_eq!(calm.energy, Some(ActivityLevel::Low));

        let conflicted = normalize_guidance("a calm but energetic dog");
        assert_eq!(conflicted.energy, None);
        // The audit trail still shows what matched
        assert!(conflicted.mappings.len() >= 2);
    }

    #[test]
    fn test_unmentioned_categories_are_omitted() {
        let delta = normalize_guidance("a quiet friend");
        assert!(delta.ages.is_empty());
        assert!(delta.sizes.is_empty());
        assert_eq!(delta.temperament, vec!["quiet".to_string()]);
    }

    #[test]
    fn test_audit_trail_always_present() {
        let delta = normalize_guidance("");
        assert!(delta.mappings.is_empty());
        let json = serde_json::to_value(&delta).unwrap();
        assert!(json.get("mappings").unwrap().is_array());
    }

    #[test]
    fn test_untrusted_payload_drops_unknowns() {
        let payload = json!({
            "ages": ["puppy", "dinosaur"],
            "sizes": ["large", "colossal"],
            "energy": "extreme",
            "temperament": ["gentle", "telepathic"]
        });
        let delta = PreferenceDelta::from_untrusted(&payload);
        assert_eq!(delta.ages, vec![AgeClass::Baby]);
        assert_eq!(delta.sizes, vec![SizeClass::Large]);
        assert_eq!(delta.energy, None);
        assert_eq!(delta.temperament, vec!["gentle".to_string()]);
    }

    #[test]
    fn test_apply_never_clobbers_explicit_filters() {
        let mut prefs = UserPreferences {
            zip_codes: vec!["10001".to_string()],
            radius_mi: 50.0,
            sizes: vec![SizeClass::Small],
            ages: vec![],
            gender: None,
            temperament: vec![],
            lifestyle: Lifestyle::default(),
        };
        let delta = normalize_guidance("a big adult dog");
        delta.apply(&mut prefs);
        // Explicit size filter wins; empty age filter is filled
        assert_eq!(prefs.sizes, vec![SizeClass::Small]);
        assert_eq!(prefs.ages, vec![AgeClass::Adult]);
    }
}
