use crate::core::phrases::PhraseKey;
use crate::models::{ActivityLevel, Dog, EnergyLevel, HomeType, ScoringWeights, UserPreferences};

/// Bounded result of evaluating one criterion.
///
/// `subscore` is in [0, 1]. Criteria with no data on either side return a
/// zero subscore and no reasons: missing data is neutral, never a penalty.
#[derive(Debug, Default)]
pub struct CriterionScore {
    pub subscore: f64,
    pub reasons: Vec<PhraseKey>,
    pub concerns: Vec<PhraseKey>,
}

impl CriterionScore {
    fn neutral() -> Self {
        Self::default()
    }

    fn matched(subscore: f64, reason: PhraseKey) -> Self {
        Self {
            subscore,
            reasons: vec![reason],
            concerns: vec![],
        }
    }

    fn violated(concern: PhraseKey) -> Self {
        Self {
            subscore: 0.0,
            reasons: vec![],
            concerns: vec![concern],
        }
    }
}

/// Raw scored candidate before contradiction removal and rendering
#[derive(Debug)]
pub struct ScoredCandidate {
    pub score: f64,
    pub reasons: Vec<PhraseKey>,
    pub concerns: Vec<PhraseKey>,
    pub shared_traits: Vec<String>,
}

/// Compute the deterministic 0-100 score for a candidate as a weighted sum
/// over independently evaluated criteria.
pub fn calculate_match_score(
    dog: &Dog,
    preferences: &UserPreferences,
    weights: &ScoringWeights,
) -> ScoredCandidate {
    let location = score_location(dog, preferences);
    let size = score_size(dog, preferences);
    let age = score_age(dog, preferences);
    let energy = score_energy(dog, preferences);
    let (temperament, shared_traits) = score_temperament(dog, preferences);
    let traits = score_trait_confidence(dog);

    let total = (location.subscore * weights.location
        + size.subscore * weights.size
        + age.subscore * weights.age
        + energy.subscore * weights.energy
        + temperament.subscore * weights.temperament
        + traits.subscore * weights.traits)
        * 100.0;

    let mut reasons = Vec::new();
    let mut concerns = Vec::new();
    for criterion in [location, size, age, energy, temperament, traits] {
        reasons.extend(criterion.reasons);
        concerns.extend(criterion.concerns);
    }

    ScoredCandidate {
        score: total.clamp(0.0, 100.0),
        reasons,
        concerns,
        shared_traits,
    }
}

/// Location fit: exponential decay inside the radius, concern outside it.
/// Candidates without a provider-reported distance are neutral.
#[inline]
fn score_location(dog: &Dog, preferences: &UserPreferences) -> CriterionScore {
    let Some(distance) = dog.distance_mi else {
        return CriterionScore::neutral();
    };
    let radius = preferences.radius_mi;
    if distance > radius {
        return CriterionScore::violated(PhraseKey::OutsideRadius);
    }
    // Closer listings score much higher, same decay curve for every run
    let subscore = (-distance / (radius * 0.5)).exp();
    CriterionScore::matched(subscore, PhraseKey::WithinRadius)
}

#[inline]
fn score_size(dog: &Dog, preferences: &UserPreferences) -> CriterionScore {
    let Some(size) = dog.size else {
        return CriterionScore::neutral();
    };
    if preferences.sizes.is_empty() {
        return CriterionScore::neutral();
    }
    if preferences.sizes.contains(&size) {
        return CriterionScore::matched(1.0, PhraseKey::SizeMatch);
    }
    // Direction of the miss relative to the nearest preferred class;
    // ties resolve toward the smaller class for reproducibility
    let nearest = preferences
        .sizes
        .iter()
        .min_by_key(|s| (size.rank().abs_diff(s.rank()), s.rank()))
        .copied()
        .unwrap_or(size);
    if size.rank() > nearest.rank() {
        CriterionScore::violated(PhraseKey::SizeTooBig)
    } else {
        CriterionScore::violated(PhraseKey::SizeTooSmall)
    }
}

#[inline]
fn score_age(dog: &Dog, preferences: &UserPreferences) -> CriterionScore {
    let Some(age) = dog.age else {
        return CriterionScore::neutral();
    };
    if preferences.ages.is_empty() {
        return CriterionScore::neutral();
    }
    if preferences.ages.contains(&age) {
        return CriterionScore::matched(1.0, PhraseKey::AgeMatch);
    }
    let min_rank = preferences.ages.iter().map(|a| a.rank()).min().unwrap_or(0);
    if age.rank() < min_rank {
        CriterionScore::violated(PhraseKey::AgeTooYoung)
    } else {
        CriterionScore::violated(PhraseKey::AgeTooOld)
    }
}

/// Lifestyle compatibility: household activity vs dog energy, apartment
/// fit, noise, and children. Each evaluated check contributes equally; no
/// evaluated checks means a neutral criterion.
fn score_energy(dog: &Dog, preferences: &UserPreferences) -> CriterionScore {
    let mut evaluated = 0usize;
    let mut points = 0.0;
    let mut out = CriterionScore::neutral();

    let dog_high_energy = matches!(dog.energy, Some(EnergyLevel::High))
        || dog.traits.high_energy.as_ref().map(|t| t.value) == Some(true);

    if let Some(activity) = preferences.lifestyle.activity {
        if let Some(energy) = dog.energy {
            evaluated += 1;
            match (activity, energy) {
                (ActivityLevel::Low, EnergyLevel::Low) => {
                    points += 1.0;
                    out.reasons.push(PhraseKey::CalmCompanion);
                }
                (ActivityLevel::High, EnergyLevel::High) => {
                    points += 1.0;
                    out.reasons.push(PhraseKey::GoodEnergyFit);
                }
                (ActivityLevel::Low, EnergyLevel::High) => {
                    out.concerns.push(PhraseKey::HighEnergy);
                }
                (ActivityLevel::Moderate, EnergyLevel::Medium) => {
                    points += 1.0;
                    out.reasons.push(PhraseKey::GoodEnergyFit);
                }
                // Fully opposite: no credit, but a mellow dog in a busy
                // household is not a welfare concern
                (ActivityLevel::High, EnergyLevel::Low) => {}
                // One step apart: partial credit, no claim either way
                _ => points += 0.5,
            }
        } else if activity == ActivityLevel::Low && dog_high_energy {
            evaluated += 1;
            out.concerns.push(PhraseKey::HighEnergy);
        }
    }

    if preferences.lifestyle.home == Some(HomeType::Apartment) {
        if let Some(apartment_ok) = &dog.traits.apartment_ok {
            evaluated += 1;
            if apartment_ok.value {
                points += 1.0;
                out.reasons.push(PhraseKey::ApartmentOk);
            } else {
                out.concerns.push(PhraseKey::NeedsSpace);
            }
        }
    }

    // Noise claims can come from both sides of the listing; contradiction
    // removal settles them later, favoring the concern
    let says_quiet = dog.temperament.iter().any(|t| t.eq_ignore_ascii_case("quiet"));
    let barky = dog.traits.barky.as_ref().map(|t| t.value);
    if says_quiet || barky.is_some() {
        evaluated += 1;
        if says_quiet {
            out.reasons.push(PhraseKey::Quiet);
        }
        match barky {
            Some(true) => out.concerns.push(PhraseKey::Vocal),
            Some(false) => {
                points += 1.0;
                if !says_quiet {
                    out.reasons.push(PhraseKey::Quiet);
                }
            }
            None => points += 1.0,
        }
    }

    if preferences.lifestyle.children_at_home == Some(true) {
        if let Some(kid_friendly) = &dog.traits.kid_friendly {
            evaluated += 1;
            if kid_friendly.value {
                points += 1.0;
                out.reasons.push(PhraseKey::KidFriendly);
            } else {
                out.concerns.push(PhraseKey::NotKidFriendly);
            }
        }
    }

    if evaluated > 0 {
        out.subscore = points / evaluated as f64;
    }
    out
}

/// Temperament overlap with diminishing returns, capped at three shared tags
fn score_temperament(dog: &Dog, preferences: &UserPreferences) -> (CriterionScore, Vec<String>) {
    if preferences.temperament.is_empty() || dog.temperament.is_empty() {
        return (CriterionScore::neutral(), vec![]);
    }

    let shared: Vec<String> = dog
        .temperament
        .iter()
        .filter(|tag| {
            preferences
                .temperament
                .iter()
                .any(|want| want.eq_ignore_ascii_case(tag))
        })
        .cloned()
        .collect();

    if shared.is_empty() {
        return (CriterionScore::neutral(), vec![]);
    }

    let subscore = (shared.len().min(3) as f64) / 3.0;
    (
        CriterionScore::matched(subscore, PhraseKey::TemperamentFit),
        shared,
    )
}

/// Inferred-trait confidence: how much the listing actually tells us
#[inline]
fn score_trait_confidence(dog: &Dog) -> CriterionScore {
    match dog.traits.average_confidence() {
        Some(confidence) => CriterionScore {
            subscore: confidence.clamp(0.0, 1.0),
            reasons: vec![],
            concerns: vec![],
        },
        None => CriterionScore::neutral(),
    }
}
