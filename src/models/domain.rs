use serde::{Deserialize, Serialize};

/// Size classes as surfaced by the adoption listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
    Xl,
}

impl SizeClass {
    /// Ordering rank, smallest first
    pub fn rank(self) -> u8 {
        match self {
            SizeClass::Small => 0,
            SizeClass::Medium => 1,
            SizeClass::Large => 2,
            SizeClass::Xl => 3,
        }
    }
}

/// Age classes as surfaced by the adoption listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeClass {
    Baby,
    Young,
    Adult,
    Senior,
}

impl AgeClass {
    /// Ordering rank, youngest first
    pub fn rank(self) -> u8 {
        match self {
            AgeClass::Baby => 0,
            AgeClass::Young => 1,
            AgeClass::Adult => 2,
            AgeClass::Senior => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Energy descriptor for a candidate dog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

/// How active the adopter's household is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeType {
    Apartment,
    House,
    Farm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    FirstTime,
    Some,
    Experienced,
}

/// Free-form lifestyle descriptors attached to a preference profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lifestyle {
    #[serde(default)]
    pub activity: Option<ActivityLevel>,
    #[serde(default)]
    pub home: Option<HomeType>,
    #[serde(default)]
    pub experience: Option<ExperienceLevel>,
    #[serde(rename = "otherPets", default)]
    pub other_pets: Option<bool>,
    #[serde(rename = "childrenAtHome", default)]
    pub children_at_home: Option<bool>,
}

/// Adopter matching preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(rename = "zipCodes")]
    pub zip_codes: Vec<String>,
    #[serde(rename = "radiusMi")]
    pub radius_mi: f64,
    #[serde(default)]
    pub sizes: Vec<SizeClass>,
    #[serde(default)]
    pub ages: Vec<AgeClass>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub temperament: Vec<String>,
    #[serde(default)]
    pub lifestyle: Lifestyle,
}

impl UserPreferences {
    /// Shape check required before matching: at least one zip code and a
    /// positive radius. Absence is a caller error, never silently defaulted.
    pub fn validate_shape(&self) -> Result<(), String> {
        if self.zip_codes.iter().all(|z| z.trim().is_empty()) {
            return Err("at least one zip code is required".to_string());
        }
        if !(self.radius_mi > 0.0) {
            return Err("search radius must be positive".to_string());
        }
        Ok(())
    }
}

/// A single inferred-trait claim with its supporting evidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitSignal {
    pub value: bool,
    pub evidence: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

/// Traits inferred from the listing text and structured attributes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferredTraits {
    #[serde(rename = "highEnergy", default)]
    pub high_energy: Option<TraitSignal>,
    #[serde(default)]
    pub barky: Option<TraitSignal>,
    #[serde(rename = "kidFriendly", default)]
    pub kid_friendly: Option<TraitSignal>,
    #[serde(rename = "apartmentOk", default)]
    pub apartment_ok: Option<TraitSignal>,
}

impl InferredTraits {
    fn signals(&self) -> impl Iterator<Item = &TraitSignal> {
        [
            self.high_energy.as_ref(),
            self.barky.as_ref(),
            self.kid_friendly.as_ref(),
            self.apartment_ok.as_ref(),
        ]
        .into_iter()
        .flatten()
    }

    /// Mean confidence across present signals, None when nothing is inferred
    pub fn average_confidence(&self) -> Option<f64> {
        let (sum, count) = self
            .signals()
            .fold((0.0, 0usize), |(s, c), t| (s + t.confidence, c + 1));
        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }
}

/// Breed names as reported by the listing source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DogBreeds {
    #[serde(default)]
    pub primary: Option<String>,
    #[serde(default)]
    pub secondary: Option<String>,
    #[serde(default)]
    pub mixed: bool,
}

impl DogBreeds {
    /// Joined display string, e.g. "Labrador Retriever, Poodle"
    pub fn display(&self) -> String {
        [self.primary.as_deref(), self.secondary.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Shelter/rescue contact details attached to a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Candidate dog as fed into the matching engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dog {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub breeds: DogBreeds,
    #[serde(default)]
    pub age: Option<AgeClass>,
    #[serde(default)]
    pub size: Option<SizeClass>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub energy: Option<EnergyLevel>,
    #[serde(default)]
    pub temperament: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Distance in miles from the search zip, as reported by the provider
    #[serde(rename = "distanceMi", default)]
    pub distance_mi: Option<f64>,
    #[serde(rename = "publishedAt", default)]
    pub published_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub organization: Option<Organization>,
    #[serde(default)]
    pub traits: InferredTraits,
}

/// Scored match for a single candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "dogId")]
    pub dog_id: String,
    pub name: String,
    pub score: f64,
    /// Why this dog fits, fixed phrases in first-seen order
    pub reasons: Vec<String>,
    /// What to watch out for, fixed phrases in first-seen order
    pub concerns: Vec<String>,
    #[serde(rename = "sharedTraits")]
    pub shared_traits: Vec<String>,
    #[serde(rename = "distanceMi")]
    pub distance_mi: Option<f64>,
}

/// Full output of a matching run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingOutcome {
    #[serde(rename = "topMatches")]
    pub top_matches: Vec<MatchResult>,
    #[serde(rename = "allMatches")]
    pub all_matches: Vec<MatchResult>,
    /// One entry per relaxation step applied to reach a viable result count
    #[serde(rename = "expansionNotes")]
    pub expansion_notes: Vec<String>,
}

/// Per-criterion scoring weights
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub location: f64,
    pub size: f64,
    pub age: f64,
    pub energy: f64,
    pub temperament: f64,
    pub traits: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            location: 0.25,
            size: 0.20,
            age: 0.20,
            energy: 0.15,
            temperament: 0.10,
            traits: 0.10,
        }
    }
}
