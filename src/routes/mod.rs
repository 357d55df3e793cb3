pub mod generate;
pub mod health;
pub mod metrics;

use axum::routing::get;
use axum::Router;

use crate::app_state::AppState;

/// Application routes. Middleware layers and the metrics endpoint are added
/// by `main`; integration tests exercise this router directly.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/generate",
            axum::routing::post(generate::submit_generation).get(generate::get_job_status),
        )
        .route("/health", get(health::health_check))
        .with_state(state)
}
