use std::sync::Arc;

use crate::services::generation::PollPolicy;
use crate::services::ratelimit::RateLimiter;
use crate::services::replicate::PredictionService;
use crate::services::store::JobStore;

/// Shared application state passed to all route handlers.
///
/// Services are constructed once at process start and injected behind trait
/// objects, so the Redis-backed and in-memory implementations (and test
/// doubles) are interchangeable.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub limiter: Arc<dyn RateLimiter>,
    pub upstream: Arc<dyn PredictionService>,
    pub poll_policy: PollPolicy,
}

impl AppState {
    pub fn new(
        store: Arc<dyn JobStore>,
        limiter: Arc<dyn RateLimiter>,
        upstream: Arc<dyn PredictionService>,
        poll_policy: PollPolicy,
    ) -> Self {
        Self {
            store,
            limiter,
            upstream,
            poll_policy,
        }
    }
}
