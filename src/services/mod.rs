// External service clients
pub mod cache;
pub mod petfinder;
pub mod postgres;
pub mod stripe;

pub use cache::SearchCache;
pub use petfinder::{PetfinderClient, PetfinderError};
pub use postgres::{PostgresClient, PostgresError};
pub use stripe::StripeClient;
