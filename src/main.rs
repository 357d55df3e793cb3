mod app_state;
mod config;
mod error;
mod models;
mod routes;
mod services;

use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::ratelimit::{MemoryRateLimiter, RateLimiter, RedisRateLimiter};
use services::replicate::ReplicateClient;
use services::store::{JobStore, MemoryJobStore, RedisJobStore};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing dreamwear server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("generation_jobs_total", "Total generation jobs submitted");
    metrics::describe_counter!(
        "generation_jobs_completed",
        "Total generation jobs that completed"
    );
    metrics::describe_counter!(
        "generation_jobs_failed",
        "Total generation jobs that failed"
    );
    metrics::describe_histogram!(
        "generation_poll_attempts",
        "Poll attempts per completed generation job"
    );

    // Initialize the job store and rate limiter
    let (store, limiter): (Arc<dyn JobStore>, Arc<dyn RateLimiter>) = match &config.redis_url {
        Some(redis_url) => {
            tracing::info!("Connecting to Redis job store");
            let store = RedisJobStore::new(redis_url).expect("Failed to initialize job store");
            let limiter = RedisRateLimiter::new(redis_url, config.rate_limit_config())
                .expect("Failed to initialize rate limiter");
            (Arc::new(store), Arc::new(limiter))
        }
        None => {
            tracing::warn!(
                "REDIS_URL not set, using in-memory job store and rate limiter (single-process mode)"
            );
            (
                Arc::new(MemoryJobStore::default()),
                Arc::new(MemoryRateLimiter::new(config.rate_limit_config())),
            )
        }
    };

    // Initialize the upstream prediction client
    tracing::info!("Initializing Replicate prediction client");
    let upstream = Arc::new(ReplicateClient::new(
        &config.replicate_api_base,
        &config.replicate_api_key,
        &config.replicate_model_version,
    ));

    // Create shared application state
    let state = AppState::new(store, limiter, upstream, config.poll_policy());

    // Build API routes
    let app = routes::router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024)); // JSON bodies only

    tracing::info!("Starting dreamwear on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
