use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::models::RemoteSubscription;
use crate::plans::{BillingProvider, ProviderError};

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Thin Stripe API client for subscription lookups.
///
/// Only the read path used by plan reconciliation is implemented; webhook
/// ingestion and checkout flows live elsewhere.
pub struct StripeClient {
    base_url: String,
    secret_key: String,
    client: Client,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self::with_base_url(secret_key, STRIPE_API_BASE.to_string())
    }

    /// Point the client at a different API host, used in tests
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            secret_key,
            client,
        }
    }
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn subscription(&self, subscription_id: &str) -> Result<RemoteSubscription, ProviderError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.base_url.trim_end_matches('/'),
            subscription_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(subscription_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "subscription lookup failed: {}",
                response.status()
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        RemoteSubscription::from_value(&payload).map_err(ProviderError::InvalidPayload)
    }
}
