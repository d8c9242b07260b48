use actix_web::{web, HttpResponse, Responder};
use chrono::Duration;
use std::sync::Arc;

use crate::core::normalizer::{normalize_guidance, PreferenceDelta};
use crate::core::validate::validate_matching_results;
use crate::core::MatchingEngine;
use crate::models::{
    Dog, ErrorResponse, FindMatchesRequest, FindMatchesResponse, HealthResponse,
};
use crate::services::{PetfinderClient, PostgresClient, SearchCache, StripeClient};
use crate::token::TokenCodec;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub petfinder: Arc<PetfinderClient>,
    pub postgres: Arc<PostgresClient>,
    pub stripe: Arc<StripeClient>,
    pub cache: Arc<SearchCache>,
    pub tokens: Arc<TokenCodec>,
    pub engine: MatchingEngine,
    /// Listings older than this many hours are dropped at fetch time
    pub freshness_hours: Option<i64>,
    /// Billing period drift tolerated before a plan counts as drifted
    pub plan_tolerance_secs: i64,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);
    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Find matches endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "preferences": {"zipCodes": ["10001"], "radiusMi": 50, "sizes": ["large"]},
///   "guidance": "calm apartment dog",
///   "candidates": null
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> impl Responder {
    let mut preferences = req.preferences.clone();

    // Fold free-text guidance and any upstream extraction into the profile.
    // Explicit filters always win; deltas only fill gaps.
    if let Some(guidance) = req.guidance.as_deref() {
        let delta = normalize_guidance(guidance);
        if !delta.mappings.is_empty() {
            tracing::debug!("guidance produced {} mappings", delta.mappings.len());
        }
        delta.apply(&mut preferences);
    }
    if let Some(extracted) = req.extracted.as_ref() {
        PreferenceDelta::from_untrusted(extracted).apply(&mut preferences);
    }

    if let Err(reason) = preferences.validate_shape() {
        tracing::info!("rejected find_matches request: {}", reason);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid preferences".to_string(),
            message: reason,
            status_code: 400,
        });
    }

    // Inline candidates bypass the provider, used by admin tooling and tests
    let candidates: Vec<Dog> = match req.candidates.clone() {
        Some(candidates) => candidates,
        None => match fetch_candidates(&state, &preferences).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!("candidate fetch failed: {}", e);
                return HttpResponse::BadGateway().json(ErrorResponse {
                    error: "Listing provider unavailable".to_string(),
                    message: e.to_string(),
                    status_code: 502,
                });
            }
        },
    };

    tracing::debug!("scoring {} candidates", candidates.len());

    let outcome = match state.engine.run(&preferences, &candidates) {
        Ok(outcome) => outcome,
        Err(e) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Matching failed".to_string(),
                message: e.to_string(),
                status_code: 400,
            });
        }
    };

    let validation = validate_matching_results(&outcome, &preferences, &candidates);
    if !validation.is_valid {
        tracing::error!("matching output failed validation: {:?}", validation.issues);
    }

    let response = FindMatchesResponse {
        total_candidates: candidates.len(),
        outcome,
        validation,
    };

    tracing::info!(
        "returning {} top matches from {} candidates",
        response.outcome.top_matches.len(),
        response.total_candidates
    );

    HttpResponse::Ok().json(response)
}

async fn fetch_candidates(
    state: &AppState,
    preferences: &crate::models::UserPreferences,
) -> Result<Vec<Dog>, crate::services::PetfinderError> {
    let key = SearchCache::search_key(preferences);
    if let Some(cached) = state.cache.get(&key).await {
        tracing::debug!("candidate cache hit for {}", key);
        return Ok(cached.as_ref().clone());
    }

    let freshness = state.freshness_hours.map(Duration::hours);
    let dogs = state.petfinder.search_dogs(preferences, freshness).await?;
    state.cache.insert(key, dogs.clone()).await;
    Ok(dogs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_response() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            timestamp: chrono::Utc::now(),
        };

        assert_eq!(response.status, "healthy");
    }
}
