//! Router-level tests for the /generate HTTP surface.
//!
//! These run against the real router with in-memory store/limiter backends
//! and a scripted upstream double, so no Redis or network is required.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use dreamwear::app_state::AppState;
use dreamwear::models::job::{JobRecord, JobStatus};
use dreamwear::routes;
use dreamwear::services::generation::PollPolicy;
use dreamwear::services::ratelimit::{MemoryRateLimiter, RateLimitConfig};
use dreamwear::services::replicate::{
    PollOutcome, PredictionInput, PredictionService, StartedPrediction, UpstreamError,
};
use dreamwear::services::store::MemoryJobStore;

/// Upstream double: an optional start failure, then a scripted sequence of
/// poll outcomes (defaulting to pending once the script runs out).
struct ScriptedUpstream {
    start_fails: bool,
    hang_on_start: bool,
    polls: tokio::sync::Mutex<VecDeque<PollOutcome>>,
}

impl ScriptedUpstream {
    fn succeeding_after(pending_polls: usize, output: serde_json::Value) -> Arc<Self> {
        let mut polls: VecDeque<PollOutcome> =
            (0..pending_polls).map(|_| PollOutcome::Pending).collect();
        polls.push_back(PollOutcome::Succeeded(output));
        Arc::new(Self {
            start_fails: false,
            hang_on_start: false,
            polls: tokio::sync::Mutex::new(polls),
        })
    }

    fn failing_start() -> Arc<Self> {
        Arc::new(Self {
            start_fails: true,
            hang_on_start: false,
            polls: tokio::sync::Mutex::new(VecDeque::new()),
        })
    }

    /// Never completes the start call: jobs stay `queued` forever.
    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            start_fails: false,
            hang_on_start: true,
            polls: tokio::sync::Mutex::new(VecDeque::new()),
        })
    }
}

#[async_trait]
impl PredictionService for ScriptedUpstream {
    async fn start(&self, _input: &PredictionInput) -> Result<StartedPrediction, UpstreamError> {
        if self.hang_on_start {
            futures::future::pending::<()>().await;
        }
        if self.start_fails {
            return Err(UpstreamError::Status { status: 500 });
        }
        Ok(StartedPrediction {
            poll_url: "http://upstream/p1".into(),
        })
    }

    async fn poll(&self, _poll_url: &str) -> Result<PollOutcome, UpstreamError> {
        Ok(self
            .polls
            .lock()
            .await
            .pop_front()
            .unwrap_or(PollOutcome::Pending))
    }
}

fn test_app(upstream: Arc<dyn PredictionService>, rate_limit: u32) -> Router {
    let state = AppState::new(
        Arc::new(MemoryJobStore::default()),
        Arc::new(MemoryRateLimiter::new(RateLimitConfig {
            limit: rate_limit,
            window: Duration::from_secs(60),
        })),
        upstream,
        PollPolicy {
            max_attempts: 60,
            interval: Duration::ZERO,
        },
    );
    routes::router(state)
}

fn generate_body() -> String {
    serde_json::json!({
        "imageUrl": "https://x/in.png",
        "theme": "Top Wear",
        "prompt": "a red jacket",
    })
    .to_string()
}

async fn post_generate(app: &Router, body: &str, ip: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/generate")
                .header("content-type", "application/json")
                .header("x-real-ip", ip)
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn get_status(app: &Router, job_id: &str) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/generate?jobId={job_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn submit(app: &Router, ip: &str) -> String {
    let response = post_generate(app, &generate_body(), ip).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    body["jobId"].as_str().unwrap().to_string()
}

async fn wait_for_terminal(app: &Router, job_id: &str) -> JobRecord {
    for _ in 0..200 {
        let response = get_status(app, job_id).await;
        assert_eq!(response.status(), StatusCode::OK);
        let record: JobRecord = serde_json::from_value(json_body(response).await).unwrap();
        if record.status.is_terminal() {
            return record;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {job_id} never reached a terminal status");
}

#[tokio::test]
async fn submitted_job_reads_queued_before_terminal_write() {
    // The upstream hangs, so no terminal write can ever race this read.
    let app = test_app(ScriptedUpstream::hanging(), 20);

    let job_id = submit(&app, "203.0.113.7").await;

    let body = json_body(get_status(&app, &job_id).await).await;
    assert_eq!(body, serde_json::json!({"status": "queued", "result": null}));
}

#[tokio::test]
async fn job_completes_with_upstream_output() {
    let output = serde_json::json!(["https://x/out.png"]);
    let app = test_app(ScriptedUpstream::succeeding_after(2, output.clone()), 20);

    let job_id = submit(&app, "203.0.113.7").await;
    let record = wait_for_terminal(&app, &job_id).await;

    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.result, Some(output));
}

#[tokio::test]
async fn terminal_record_is_immutable_across_repeated_reads() {
    let app = test_app(
        ScriptedUpstream::succeeding_after(0, serde_json::json!("https://x/out.png")),
        20,
    );

    let job_id = submit(&app, "203.0.113.7").await;
    let first = wait_for_terminal(&app, &job_id).await;

    for _ in 0..3 {
        let body = json_body(get_status(&app, &job_id).await).await;
        let record: JobRecord = serde_json::from_value(body).unwrap();
        assert_eq!(record, first);
    }
}

#[tokio::test]
async fn start_failure_yields_failed_job() {
    let app = test_app(ScriptedUpstream::failing_start(), 20);

    let job_id = submit(&app, "203.0.113.7").await;
    let record = wait_for_terminal(&app, &job_id).await;

    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.result, None);
}

#[tokio::test]
async fn missing_job_id_is_bad_request() {
    let app = test_app(ScriptedUpstream::hanging(), 20);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/generate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_job_id_is_not_found() {
    let app = test_app(ScriptedUpstream::hanging(), 20);

    let response = get_status(&app, &Uuid::new_v4().to_string()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // An id that is not even a UUID cannot name a stored job either.
    let response = get_status(&app, "no-such-job").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = test_app(ScriptedUpstream::hanging(), 20);

    let response = post_generate(&app, "{not json", "203.0.113.7").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_theme_is_bad_request() {
    let app = test_app(ScriptedUpstream::hanging(), 20);

    let body = serde_json::json!({
        "imageUrl": "https://x/in.png",
        "theme": "Head Wear",
        "prompt": "a hat",
    })
    .to_string();

    let response = post_generate(&app, &body, "203.0.113.7").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn over_limit_submission_is_throttled_per_identity() {
    let app = test_app(ScriptedUpstream::hanging(), 2);

    submit(&app, "203.0.113.7").await;
    submit(&app, "203.0.113.7").await;

    let response = post_generate(&app, &generate_body(), "203.0.113.7").await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["x-ratelimit-limit"], "2");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    // A different caller is not affected.
    submit(&app, "198.51.100.4").await;
}

#[tokio::test]
async fn health_reports_store_status() {
    let app = test_app(ScriptedUpstream::hanging(), 20);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["checks"]["store"]["status"], "ok");
}
