use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{Dog, UserPreferences};

/// In-process cache for candidate search results.
///
/// Keys are derived from the search-relevant preference fields only, so
/// two requests that differ in guidance text but search the same zips and
/// radius share an entry. Entries age out on a fixed TTL; staleness beyond
/// that is handled by the freshness cutoff at fetch time.
pub struct SearchCache {
    inner: Cache<String, Arc<Vec<Dog>>>,
}

impl SearchCache {
    pub fn new(max_entries: u64, ttl_secs: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();
        Self { inner }
    }

    /// Cache key from the fields that affect the candidate pool
    pub fn search_key(preferences: &UserPreferences) -> String {
        let mut zips: Vec<&str> = preferences
            .zip_codes
            .iter()
            .map(|z| z.trim())
            .filter(|z| !z.is_empty())
            .collect();
        zips.sort_unstable();

        let mut ages: Vec<String> = preferences
            .ages
            .iter()
            .map(|a| format!("{:?}", a).to_lowercase())
            .collect();
        ages.sort_unstable();

        format!(
            "search:{}:{:.0}:{}",
            zips.join(","),
            preferences.radius_mi,
            ages.join(",")
        )
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Vec<Dog>>> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: String, dogs: Vec<Dog>) {
        self.inner.insert(key, Arc::new(dogs)).await;
    }
}
