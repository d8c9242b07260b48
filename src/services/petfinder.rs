use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::core::matcher::MAX_RADIUS_FACTOR;
use crate::models::{
    AgeClass, Dog, DogBreeds, EnergyLevel, Gender, InferredTraits, Organization, SizeClass,
    TraitSignal, UserPreferences,
};

/// Errors that can occur when talking to Petfinder
#[derive(Debug, Error)]
pub enum PetfinderError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid client credentials")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Breeds excluded from every search, case-insensitive substring match
const EXCLUDED_BREEDS: &[&str] = &[
    "Husky",
    "Coonhound",
    "Pit Bull",
    "Jack Russell Terrier",
    "German Shepherd",
    "Carolina Dog Mix",
    "Bull Terrier",
    "Chihuahua",
    "Rhodesian Ridgeback",
    "Rottweiler",
    "English Bulldog",
    "American Staffordshire Terrier",
];

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Petfinder API client
///
/// Handles OAuth client-credentials token caching, paged listing search per
/// zip code, and parsing duck-typed animal payloads into validated `Dog`
/// records.
pub struct PetfinderClient {
    base_url: String,
    client_id: String,
    client_secret: String,
    client: Client,
    token: Mutex<Option<CachedToken>>,
}

impl PetfinderClient {
    pub fn new(base_url: String, client_id: String, client_secret: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            client_id,
            client_secret,
            client,
            token: Mutex::new(None),
        }
    }

    /// Fetch (or reuse) an OAuth access token
    async fn token(&self) -> Result<String, PetfinderError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/v2/oauth2/token", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PetfinderError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(PetfinderError::ApiError(format!(
                "token request failed: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        let value = json
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| PetfinderError::InvalidResponse("missing access_token".into()))?
            .to_string();
        let expires_in = json.get("expires_in").and_then(Value::as_u64).unwrap_or(3600);

        *cached = Some(CachedToken {
            value: value.clone(),
            // Refresh a minute early to avoid racing the expiry
            expires_at: Instant::now() + std::time::Duration::from_secs(expires_in.saturating_sub(60)),
        });

        Ok(value)
    }

    /// Search adoptable dogs for every zip code in the preferences.
    ///
    /// Results are de-duplicated across zips by id and by fingerprint, breed
    /// exclusions are applied, and listings older than `freshness` (when
    /// set) are dropped.
    pub async fn search_dogs(
        &self,
        preferences: &UserPreferences,
        freshness: Option<Duration>,
    ) -> Result<Vec<Dog>, PetfinderError> {
        let token = self.token().await?;
        let cutoff = freshness.map(|window| Utc::now() - window);

        let mut dogs: Vec<Dog> = Vec::new();
        let mut seen_ids: Vec<String> = Vec::new();
        let mut seen_fingerprints: Vec<String> = Vec::new();

        for zip in &preferences.zip_codes {
            let zip = zip.trim();
            if zip.is_empty() {
                continue;
            }
            let animals = self
                .collect_animals_for_zip(&token, zip, preferences, cutoff)
                .await?;

            for animal in &animals {
                let Some(dog) = parse_animal(animal) else {
                    tracing::debug!("skipping unparseable animal payload");
                    continue;
                };
                if let (Some(cutoff), Some(published)) = (cutoff, dog.published_at) {
                    if published < cutoff {
                        continue;
                    }
                }
                if breed_excluded(&dog.breeds) {
                    continue;
                }
                let print = fingerprint(&dog);
                if seen_ids.contains(&dog.id) || seen_fingerprints.contains(&print) {
                    continue;
                }
                seen_ids.push(dog.id.clone());
                seen_fingerprints.push(print);
                dogs.push(dog);
            }
        }

        tracing::debug!(
            "petfinder search returned {} unique dogs across {} zips",
            dogs.len(),
            preferences.zip_codes.len()
        );

        Ok(dogs)
    }

    async fn collect_animals_for_zip(
        &self,
        token: &str,
        zip: &str,
        preferences: &UserPreferences,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<Vec<Value>, PetfinderError> {
        let url = format!("{}/v2/animals", self.base_url.trim_end_matches('/'));
        // Fetch out to the widest radius the relaxation ladder can reach,
        // and leave age unfiltered; the engine narrows to the base radius
        // and the preferred ages itself, so its relaxation steps have
        // candidates to add back
        let distance = (preferences.radius_mi * MAX_RADIUS_FACTOR).ceil() as u32;

        let mut results = Vec::new();
        let mut page = 1u32;

        loop {
            let query: Vec<(&str, String)> = vec![
                ("type", "dog".to_string()),
                ("status", "adoptable".to_string()),
                ("location", zip.to_string()),
                ("distance", distance.to_string()),
                ("sort", "recent".to_string()),
                ("limit", "100".to_string()),
                ("page", page.to_string()),
            ];

            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .query(&query)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(PetfinderError::ApiError(format!(
                    "animal search failed for {}: {}",
                    zip,
                    response.status()
                )));
            }

            let payload: Value = response.json().await?;
            let animals = payload
                .get("animals")
                .and_then(Value::as_array)
                .ok_or_else(|| PetfinderError::InvalidResponse("missing animals array".into()))?;
            if animals.is_empty() {
                break;
            }

            // Pages are sorted most-recent first: once the oldest entry on
            // a page predates the cutoff, later pages are older still
            let last_published = animals
                .last()
                .and_then(|a| a.get("published_at"))
                .and_then(Value::as_str)
                .and_then(parse_datetime);

            results.extend(animals.iter().cloned());

            let total_pages = payload
                .get("pagination")
                .and_then(|p| p.get("total_pages"))
                .and_then(Value::as_u64)
                .unwrap_or(page as u64);
            if page as u64 >= total_pages {
                break;
            }
            if let (Some(cutoff), Some(last)) = (cutoff, last_published) {
                if last < cutoff {
                    break;
                }
            }
            page += 1;
        }

        Ok(results)
    }
}

/// Case-insensitive substring check against the exclusion table
pub fn breed_excluded(breeds: &DogBreeds) -> bool {
    let text = breeds.display().to_lowercase();
    EXCLUDED_BREEDS
        .iter()
        .any(|banned| text.contains(&banned.to_lowercase()))
}

/// Identifying fingerprint used to catch the same dog listed under
/// different ids across zip searches
pub fn fingerprint(dog: &Dog) -> String {
    let field = |s: Option<&str>| s.unwrap_or("").trim().to_lowercase();
    [
        field(Some(dog.name.as_str())),
        field(dog.breeds.primary.as_deref()),
        field(dog.breeds.secondary.as_deref()),
        dog.age.map(|a| format!("{:?}", a)).unwrap_or_default().to_lowercase(),
        dog.size.map(|s| format!("{:?}", s)).unwrap_or_default().to_lowercase(),
        dog.gender.map(|g| format!("{:?}", g)).unwrap_or_default().to_lowercase(),
    ]
    .join("|")
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse one duck-typed animal payload into a validated `Dog`.
/// Returns None when the payload is missing its id or name.
pub fn parse_animal(value: &Value) -> Option<Dog> {
    let id = match value.get("id") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return None,
    };
    let name = value.get("name").and_then(Value::as_str)?.to_string();

    let breeds_value = value.get("breeds").cloned().unwrap_or(Value::Null);
    let breeds = DogBreeds {
        primary: breeds_value
            .get("primary")
            .and_then(Value::as_str)
            .map(str::to_string),
        secondary: breeds_value
            .get("secondary")
            .and_then(Value::as_str)
            .map(str::to_string),
        mixed: breeds_value
            .get("mixed")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    };

    let age = value.get("age").and_then(Value::as_str).and_then(parse_age);
    let size = value.get("size").and_then(Value::as_str).and_then(parse_size);
    let gender = value
        .get("gender")
        .and_then(Value::as_str)
        .and_then(|g| match g.to_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        });

    let temperament: Vec<String> = value
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(|t| t.to_lowercase())
                .collect()
        })
        .unwrap_or_default();

    let description = value
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    let organization = value.get("contact").map(|contact| Organization {
        name: value
            .get("organization")
            .and_then(|o| o.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        email: contact.get("email").and_then(Value::as_str).map(str::to_string),
        phone: contact.get("phone").and_then(Value::as_str).map(str::to_string),
    });

    let traits = infer_traits(description.as_deref().unwrap_or(""), &temperament, value);
    let energy = infer_energy(&traits);

    Some(Dog {
        id,
        name,
        breeds,
        age,
        size,
        gender,
        energy,
        temperament,
        description,
        distance_mi: value.get("distance").and_then(Value::as_f64),
        published_at: value
            .get("published_at")
            .and_then(Value::as_str)
            .and_then(parse_datetime),
        url: value.get("url").and_then(Value::as_str).map(str::to_string),
        organization,
        traits,
    })
}

fn parse_age(raw: &str) -> Option<AgeClass> {
    match raw.to_lowercase().as_str() {
        "baby" => Some(AgeClass::Baby),
        "young" => Some(AgeClass::Young),
        "adult" => Some(AgeClass::Adult),
        "senior" => Some(AgeClass::Senior),
        _ => None,
    }
}

fn parse_size(raw: &str) -> Option<SizeClass> {
    match raw.to_lowercase().as_str() {
        "small" => Some(SizeClass::Small),
        "medium" => Some(SizeClass::Medium),
        "large" => Some(SizeClass::Large),
        "extra large" | "xlarge" | "xl" => Some(SizeClass::Xl),
        _ => None,
    }
}

/// Derive trait signals from the environment block, tags, and description
/// keywords. Signals are only asserted with direct support; confidence
/// reflects the strength of the source (structured fields over free text).
fn infer_traits(description: &str, tags: &[String], value: &Value) -> InferredTraits {
    let text = description.to_lowercase();
    let mut traits = InferredTraits::default();

    if let Some(children) = value
        .get("environment")
        .and_then(|e| e.get("children"))
        .and_then(Value::as_bool)
    {
        traits.kid_friendly = Some(TraitSignal {
            value: children,
            evidence: if children {
                "listed as good with children".to_string()
            } else {
                "listed as not good with children".to_string()
            },
            confidence: 0.9,
        });
    }

    if text.contains("barks") || text.contains("vocal") || text.contains("barky") {
        traits.barky = Some(TraitSignal {
            value: true,
            evidence: "description mentions barking".to_string(),
            confidence: 0.6,
        });
    } else if tags.iter().any(|t| t == "quiet") || text.contains("quiet") {
        traits.barky = Some(TraitSignal {
            value: false,
            evidence: "described as quiet".to_string(),
            confidence: 0.6,
        });
    }

    let energetic_tag = tags.iter().any(|t| t == "energetic" || t == "active" || t == "athletic");
    if energetic_tag || text.contains("high energy") || text.contains("lots of energy") {
        traits.high_energy = Some(TraitSignal {
            value: true,
            evidence: "described as high energy".to_string(),
            confidence: if energetic_tag { 0.8 } else { 0.6 },
        });
    } else if text.contains("couch potato") || text.contains("lazy") || text.contains("calm") {
        traits.high_energy = Some(TraitSignal {
            value: false,
            evidence: "described as calm".to_string(),
            confidence: 0.6,
        });
    }

    if text.contains("apartment") {
        traits.apartment_ok = Some(TraitSignal {
            value: true,
            evidence: "description mentions apartment living".to_string(),
            confidence: 0.5,
        });
    }

    traits
}

fn infer_energy(traits: &InferredTraits) -> Option<EnergyLevel> {
    traits.high_energy.as_ref().map(|signal| {
        if signal.value {
            EnergyLevel::High
        } else {
            EnergyLevel::Low
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn animal() -> Value {
        json!({
            "id": 12345,
            "name": "Biscuit",
            "age": "Adult",
            "size": "Large",
            "gender": "Female",
            "breeds": {"primary": "Labrador Retriever", "secondary": null, "mixed": true},
            "tags": ["Friendly", "Quiet"],
            "description": "A calm, quiet girl who loves apartment naps.",
            "distance": 12.4,
            "published_at": "2025-09-18T04:25:04+00:00",
            "url": "https://example.org/biscuit",
            "contact": {"email": "adopt@example.org", "phone": "555-0101"},
            "environment": {"children": true, "dogs": true, "cats": null}
        })
    }

    #[test]
    fn test_parse_animal() {
        let dog = parse_animal(&animal()).unwrap();
        assert_eq!(dog.id, "12345");
        assert_eq!(dog.age, Some(AgeClass::Adult));
        assert_eq!(dog.size, Some(SizeClass::Large));
        assert_eq!(dog.gender, Some(Gender::Female));
        assert_eq!(dog.distance_mi, Some(12.4));
        assert_eq!(dog.temperament, vec!["friendly", "quiet"]);
        assert_eq!(dog.traits.kid_friendly.as_ref().unwrap().value, true);
        assert_eq!(dog.traits.barky.as_ref().unwrap().value, false);
        assert_eq!(dog.energy, Some(EnergyLevel::Low));
    }

    #[test]
    fn test_parse_animal_requires_id_and_name() {
        assert!(parse_animal(&json!({"name": "NoId"})).is_none());
        assert!(parse_animal(&json!({"id": 1})).is_none());
    }

    #[test]
    fn test_breed_exclusion_substring_match() {
        let excluded = DogBreeds {
            primary: Some("Siberian Husky".to_string()),
            secondary: None,
            mixed: false,
        };
        assert!(breed_excluded(&excluded));

        let fine = DogBreeds {
            primary: Some("Golden Retriever".to_string()),
            secondary: None,
            mixed: false,
        };
        assert!(!breed_excluded(&fine));
    }

    #[test]
    fn test_fingerprint_matches_same_dog_across_listings() {
        let a = parse_animal(&animal()).unwrap();
        let mut b_payload = animal();
        b_payload["id"] = json!(99999);
        b_payload["distance"] = json!(44.0);
        let b = parse_animal(&b_payload).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[tokio::test]
    async fn test_search_dedupes_and_filters() {
        let mut server = mockito::Server::new_async().await;

        let _token = server
            .mock("POST", "/v2/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token": "tok", "expires_in": 3600}"#)
            .create_async()
            .await;

        let husky = {
            let mut a = animal();
            a["id"] = json!(222);
            a["name"] = json!("Storm");
            a["breeds"] = json!({"primary": "Husky", "secondary": null, "mixed": false});
            a
        };
        let body = json!({
            "animals": [animal(), animal(), husky],
            "pagination": {"total_pages": 1}
        });
        let _animals = server
            .mock("GET", "/v2/animals")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = PetfinderClient::new(server.url(), "id".to_string(), "secret".to_string());
        let prefs = UserPreferences {
            zip_codes: vec!["10001".to_string()],
            radius_mi: 50.0,
            sizes: vec![],
            ages: vec![],
            gender: None,
            temperament: vec![],
            lifestyle: Default::default(),
        };

        let dogs = client.search_dogs(&prefs, None).await.unwrap();
        // Duplicate listing collapsed, excluded breed dropped
        assert_eq!(dogs.len(), 1);
        assert_eq!(dogs[0].name, "Biscuit");
    }

    #[tokio::test]
    async fn test_search_covers_the_widest_relaxation_radius() {
        let mut server = mockito::Server::new_async().await;

        let _token = server
            .mock("POST", "/v2/oauth2/token")
            .with_status(200)
            .with_body(r#"{"access_token": "tok", "expires_in": 3600}"#)
            .create_async()
            .await;

        // Only answers when the fetch asks for double the base radius
        let far_dog = {
            let mut a = animal();
            a["distance"] = json!(80.0);
            a
        };
        let body = json!({
            "animals": [far_dog],
            "pagination": {"total_pages": 1}
        });
        let _animals = server
            .mock("GET", "/v2/animals")
            .match_query(mockito::Matcher::UrlEncoded(
                "distance".to_string(),
                "100".to_string(),
            ))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let client = PetfinderClient::new(server.url(), "id".to_string(), "secret".to_string());
        let prefs = UserPreferences {
            zip_codes: vec!["10001".to_string()],
            radius_mi: 50.0,
            sizes: vec![],
            ages: vec![],
            gender: None,
            temperament: vec![],
            lifestyle: Default::default(),
        };

        let dogs = client.search_dogs(&prefs, None).await.unwrap();
        assert_eq!(dogs.len(), 1);
        assert_eq!(dogs[0].distance_mi, Some(80.0));

        // A dog between 1x and 2x the radius is in the fetched pool, so the
        // engine's radius relaxation can genuinely add it back
        let engine = crate::core::MatchingEngine::with_defaults();
        let outcome = engine.run(&prefs, &dogs).unwrap();
        assert_eq!(outcome.all_matches.len(), 1);
        assert_eq!(outcome.all_matches[0].dog_id, dogs[0].id);
        assert!(outcome
            .expansion_notes
            .iter()
            .any(|n| n.contains("radius")));
    }
}
