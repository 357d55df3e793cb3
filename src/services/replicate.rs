use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::models::generation::ClothingCategory;

/// Input for a single prediction start call.
#[derive(Debug, Clone)]
pub struct PredictionInput {
    pub image: String,
    pub clothing: ClothingCategory,
    pub prompt: String,
}

/// Handle returned by a successful start call: the URL to poll for progress.
/// Held in memory by the running generation task only, never persisted.
#[derive(Debug, Clone)]
pub struct StartedPrediction {
    pub poll_url: String,
}

/// One observation of the upstream prediction's status.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Succeeded(serde_json::Value),
    Failed,
    /// Any status other than `succeeded`/`failed` counts as still running.
    Pending,
}

/// Upstream inference service that performs the actual image transformation.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn start(&self, input: &PredictionInput) -> Result<StartedPrediction, UpstreamError>;

    async fn poll(&self, poll_url: &str) -> Result<PollOutcome, UpstreamError>;
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {status}")]
    Status { status: u16 },

    #[error("Failed to parse upstream response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Client for the Replicate predictions API.
pub struct ReplicateClient {
    http: Client,
    api_base: String,
    api_key: String,
    model_version: String,
}

#[derive(Deserialize)]
struct StartResponse {
    urls: PredictionUrls,
}

#[derive(Deserialize)]
struct PredictionUrls {
    get: String,
}

#[derive(Deserialize)]
struct PredictionState {
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
}

impl ReplicateClient {
    pub fn new(api_base: &str, api_key: &str, model_version: &str) -> Self {
        Self {
            http: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model_version: model_version.to_string(),
        }
    }
}

#[async_trait]
impl PredictionService for ReplicateClient {
    async fn start(&self, input: &PredictionInput) -> Result<StartedPrediction, UpstreamError> {
        let url = format!("{}/v1/predictions", self.api_base);

        let body = serde_json::json!({
            "version": self.model_version,
            "input": {
                "image": input.image,
                "clothing": input.clothing.to_string(),
                "prompt": input.prompt,
            },
        });

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(UpstreamError::Http)?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                status: response.status().as_u16(),
            });
        }

        let payload = response.text().await.map_err(UpstreamError::Http)?;
        let start: StartResponse = serde_json::from_str(&payload).map_err(UpstreamError::Parse)?;

        Ok(StartedPrediction {
            poll_url: start.urls.get,
        })
    }

    async fn poll(&self, poll_url: &str) -> Result<PollOutcome, UpstreamError> {
        let response = self
            .http
            .get(poll_url)
            .header("Authorization", format!("Token {}", self.api_key))
            .send()
            .await
            .map_err(UpstreamError::Http)?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                status: response.status().as_u16(),
            });
        }

        let payload = response.text().await.map_err(UpstreamError::Http)?;
        let state: PredictionState =
            serde_json::from_str(&payload).map_err(UpstreamError::Parse)?;

        Ok(match state.status.as_str() {
            "succeeded" => PollOutcome::Succeeded(state.output.unwrap_or(serde_json::Value::Null)),
            "failed" => PollOutcome::Failed,
            _ => PollOutcome::Pending,
        })
    }
}
