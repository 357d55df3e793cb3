use std::time::Duration;

use serde::Deserialize;

use crate::services::generation::PollPolicy;
use crate::services::ratelimit::RateLimitConfig;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Redis connection string for the job store and rate limiter. When
    /// unset, both fall back to in-memory backends (single-process mode,
    /// jobs do not survive a restart).
    pub redis_url: Option<String>,

    /// Replicate API token
    pub replicate_api_key: String,

    /// Replicate API base URL (override for testing against a mock)
    #[serde(default = "default_replicate_api_base")]
    pub replicate_api_base: String,

    /// Pinned model version for the try-on prediction
    #[serde(default = "default_replicate_model_version")]
    pub replicate_model_version: String,

    /// Admissions per caller per rate-limit window
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Rate-limit window length in minutes
    #[serde(default = "default_rate_limit_window_minutes")]
    pub rate_limit_window_minutes: u64,

    /// Maximum poll attempts per job
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,

    /// Pause between poll attempts in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_replicate_api_base() -> String {
    "https://api.replicate.com".to_string()
}

fn default_replicate_model_version() -> String {
    "f203e9b8755a51b23f8ebdd80bb4f8b7177685b8d3fcca949abfbf8606b6d42a".to_string()
}

fn default_rate_limit() -> u32 {
    20
}

fn default_rate_limit_window_minutes() -> u64 {
    1440
}

fn default_poll_max_attempts() -> u32 {
    60
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            limit: self.rate_limit,
            window: Duration::from_secs(self.rate_limit_window_minutes * 60),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.poll_max_attempts,
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
