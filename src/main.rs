mod config;
mod core;
mod models;
mod plans;
mod routes;
mod services;
mod token;

use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use config::Settings;
use core::{MatchingConfig, MatchingEngine};
use models::ScoringWeights;
use routes::matches::AppState;
use services::{PetfinderClient, PostgresClient, SearchCache, StripeClient};
use std::sync::Arc;
use token::TokenCodec;
use tracing::{error, info};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap_or_default())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(
    err: error::JsonPayloadError,
    req: &actix_web::HttpRequest,
) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(
    err: error::QueryPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting DogYenta Algo matching service...");

    // Load configuration, from an explicit file when CONFIG_FILE is set
    let settings = match std::env::var("CONFIG_FILE") {
        Ok(path) => Settings::load_from(&path),
        Err(_) => Settings::load(),
    }
    .unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    info!("Configuration loaded successfully");

    // Initialize Petfinder client
    let petfinder = Arc::new(PetfinderClient::new(
        settings.petfinder.base_url,
        settings.petfinder.client_id,
        settings.petfinder.client_secret,
    ));

    info!("Petfinder client initialized");

    // Initialize Stripe client
    let stripe = Arc::new(StripeClient::new(settings.stripe.secret_key));

    // Initialize the unsubscribe token codec
    let tokens = Arc::new(TokenCodec::new(settings.tokens.secret).unwrap_or_else(|e| {
        error!("Failed to initialize token codec: {}", e);
        panic!("Token configuration error: {}", e);
    }));

    // Initialize the in-process search cache
    let cache_entries = settings.cache.max_entries.unwrap_or(1000);
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let cache = Arc::new(SearchCache::new(cache_entries, cache_ttl));

    info!(
        "Search cache initialized ({} entries, TTL: {}s)",
        cache_entries, cache_ttl
    );

    // Initialize PostgreSQL client
    let db_max_conn = settings.database.max_connections.unwrap_or(10);
    let db_min_conn = settings.database.min_connections.unwrap_or(1);

    let postgres = Arc::new(
        PostgresClient::new(&settings.database.url, db_max_conn, db_min_conn)
            .await
            .unwrap_or_else(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                panic!("PostgreSQL connection error: {}", e);
            }),
    );

    info!("PostgreSQL client initialized (max: {} connections)", db_max_conn);

    // Initialize the matching engine with configured weights
    let weights = ScoringWeights {
        location: settings.scoring.weights.location,
        size: settings.scoring.weights.size,
        age: settings.scoring.weights.age,
        energy: settings.scoring.weights.energy,
        temperament: settings.scoring.weights.temperament,
        traits: settings.scoring.weights.traits,
    };

    let defaults = MatchingConfig::default();
    let matching_config = MatchingConfig {
        top_n: settings.matching.top_n.unwrap_or(defaults.top_n),
        min_results: settings.matching.min_results.unwrap_or(defaults.min_results),
        top_score_floor: settings
            .matching
            .top_score_floor
            .unwrap_or(defaults.top_score_floor),
    };
    let engine = MatchingEngine::new(weights, matching_config);

    info!("Matching engine initialized with weights: {:?}", weights);

    // Build application state
    let app_state = AppState {
        petfinder,
        postgres,
        stripe,
        cache,
        tokens,
        engine,
        freshness_hours: settings.matching.freshness_hours,
        plan_tolerance_secs: settings.matching.plan_tolerance_secs.unwrap_or(3600),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
