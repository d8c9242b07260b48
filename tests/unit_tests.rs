// Focused tests for scoring and normalization through the public API

use dogyenta_algo::core::{calculate_match_score, normalize_guidance, MatchingEngine};
use dogyenta_algo::models::{
    AgeClass, Dog, DogBreeds, EnergyLevel, Gender, InferredTraits, Lifestyle, ScoringWeights,
    SizeClass, TraitSignal, UserPreferences,
};

fn bare_dog(id: &str) -> Dog {
    Dog {
        id: id.to_string(),
        name: format!("Dog {}", id),
        breeds: DogBreeds::default(),
        age: None,
        size: None,
        gender: None,
        energy: None,
        temperament: vec![],
        description: None,
        distance_mi: None,
        published_at: None,
        url: None,
        organization: None,
        traits: InferredTraits::default(),
    }
}

fn prefs() -> UserPreferences {
    UserPreferences {
        zip_codes: vec!["10001".to_string()],
        radius_mi: 50.0,
        sizes: vec![SizeClass::Large],
        ages: vec![AgeClass::Adult],
        gender: None,
        temperament: vec!["friendly".to_string()],
        lifestyle: Lifestyle::default(),
    }
}

#[test]
fn test_scores_stay_in_bounds() {
    let weights = ScoringWeights::default();
    let preferences = prefs();

    let mut perfect = bare_dog("perfect");
    perfect.size = Some(SizeClass::Large);
    perfect.age = Some(AgeClass::Adult);
    perfect.distance_mi = Some(0.5);
    perfect.temperament = vec!["friendly".to_string()];
    perfect.traits.kid_friendly = Some(TraitSignal {
        value: true,
        evidence: "listed as good with children".to_string(),
        confidence: 1.0,
    });

    let mut awful = bare_dog("awful");
    awful.size = Some(SizeClass::Small);
    awful.age = Some(AgeClass::Baby);
    awful.distance_mi = Some(500.0);

    for dog in [&perfect, &awful, &bare_dog("bare")] {
        let scored = calculate_match_score(dog, &preferences, &weights);
        assert!(scored.score >= 0.0 && scored.score <= 100.0);
    }

    let best = calculate_match_score(&perfect, &preferences, &weights);
    let worst = calculate_match_score(&awful, &preferences, &weights);
    assert!(best.score > worst.score);
}

#[test]
fn test_missing_data_is_neutral_not_penalized() {
    let weights = ScoringWeights::default();
    let preferences = prefs();

    let bare = calculate_match_score(&bare_dog("bare"), &preferences, &weights);

    let mut violating = bare_dog("far");
    violating.distance_mi = Some(500.0);
    let far = calculate_match_score(&violating, &preferences, &weights);

    // Unknown distance scores no worse than a known violation, and the
    // violation is the one that carries a concern
    assert!(bare.score >= far.score);
    assert!(bare.concerns.is_empty());
    assert!(!far.concerns.is_empty());
}

#[test]
fn test_energy_synonyms_require_agreement() {
    // One clear signal asserts a level
    let calm = normalize_guidance("we want a mellow couch companion");
    assert!(calm.energy.is_some());

    // Conflicting signals assert nothing but still land in the audit trail
    let mixed = normalize_guidance("a calm dog that is also energetic");
    assert!(mixed.energy.is_none());
    assert!(mixed.mappings.len() >= 2);
}

#[test]
fn test_normalizer_is_case_insensitive() {
    let delta = normalize_guidance("SMALL dog please, QUIET and Friendly");
    assert_eq!(delta.sizes, vec![SizeClass::Small]);
    assert!(delta.temperament.contains(&"quiet".to_string()));
    assert!(delta.temperament.contains(&"friendly".to_string()));
}

#[test]
fn test_tiebreak_is_id_ascending() {
    let engine = MatchingEngine::with_defaults();
    let mut preferences = prefs();
    preferences.sizes.clear();
    preferences.ages.clear();
    preferences.temperament.clear();

    // Identical dogs except for id score identically
    let mut a = bare_dog("zeta");
    a.distance_mi = Some(10.0);
    let mut b = bare_dog("alpha");
    b.distance_mi = Some(10.0);

    let outcome = engine.run(&preferences, &[a, b]).unwrap();
    assert_eq!(outcome.all_matches[0].dog_id, "alpha");
    assert_eq!(outcome.all_matches[1].dog_id, "zeta");
}

#[test]
fn test_gender_mismatch_filters_strictly() {
    let engine = MatchingEngine::with_defaults();
    let mut preferences = prefs();
    preferences.gender = Some(Gender::Female);
    preferences.sizes.clear();
    preferences.ages.clear();

    let mut female = bare_dog("f-1");
    female.gender = Some(Gender::Female);
    female.distance_mi = Some(5.0);
    let mut male = bare_dog("m-1");
    male.gender = Some(Gender::Male);
    male.distance_mi = Some(5.0);

    // Enough matching candidates that no relaxation happens
    let mut f2 = female.clone();
    f2.id = "f-2".to_string();
    let mut f3 = female.clone();
    f3.id = "f-3".to_string();

    let outcome = engine.run(&preferences, &[female, male, f2, f3]).unwrap();
    assert_eq!(outcome.all_matches.len(), 3);
    assert!(outcome.all_matches.iter().all(|m| m.dog_id.starts_with("f-")));
}

#[test]
fn test_high_energy_dog_flagged_for_low_activity_home() {
    let weights = ScoringWeights::default();
    let mut preferences = prefs();
    preferences.lifestyle.activity = Some(dogyenta_algo::models::ActivityLevel::Low);

    let mut dog = bare_dog("zoomies");
    dog.energy = Some(EnergyLevel::High);
    dog.traits.high_energy = Some(TraitSignal {
        value: true,
        evidence: "described as high energy".to_string(),
        confidence: 0.8,
    });

    let scored = calculate_match_score(&dog, &preferences, &weights);
    assert!(!scored.concerns.is_empty());
}
