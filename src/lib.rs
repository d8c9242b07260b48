//! DogYenta Algo - Matching and lifecycle service for the DogYenta adoption app
//!
//! This library provides the deterministic dog-matching engine used by the
//! DogYenta backend, along with the supporting pieces the product runs on:
//! signed unsubscribe tokens, subscription-plan reconciliation against the
//! billing provider, and table-driven normalization of adopter guidance.

pub mod config;
pub mod core;
pub mod models;
pub mod plans;
pub mod routes;
pub mod services;
pub mod token;

// Re-export commonly used types
pub use core::{
    calculate_match_score, normalize_guidance, validate_matching_results, MatchingConfig,
    MatchingEngine, ValidationReport,
};
pub use models::{
    Dog, FindMatchesRequest, FindMatchesResponse, MatchResult, MatchingOutcome, ScoringWeights,
    UserPreferences,
};
pub use plans::PlanReconciler;
pub use token::TokenCodec;
