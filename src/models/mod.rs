// Model exports

pub mod domain;
pub mod plans;
pub mod requests;
pub mod responses;

pub use domain::{
    ActivityLevel, AgeClass, Dog, DogBreeds, EnergyLevel, ExperienceLevel, Gender, HomeType,
    InferredTraits, Lifestyle, MatchResult, MatchingOutcome, Organization, ScoringWeights,
    SizeClass, TraitSignal, UserPreferences,
};
pub use plans::{
    ConsistencyReport, Mismatch, MismatchField, PlanRecord, PlanStatus, PlanTier,
    RemoteSubscription, SyncFailure, SyncReport,
};
pub use requests::{FindMatchesRequest, UnsubscribeQuery};
pub use responses::{ErrorResponse, FindMatchesResponse, HealthResponse, UnsubscribeResponse};
