use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use uuid::Uuid;

use crate::models::generation::GenerateRequest;
use crate::models::job::JobRecord;
use crate::services::replicate::{PollOutcome, PredictionInput, PredictionService};
use crate::services::store::JobStore;

/// Bounds for the poll loop. The attempt budget governs successive polls of a
/// still-running prediction; it is not an error-recovery mechanism.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(1),
        }
    }
}

/// Launch the generation task for an already-recorded `queued` job.
///
/// Detached from the request lifecycle: the caller never awaits it, so the
/// submission response is not delayed. A watchdog converts a panic inside the
/// task into the terminal `failed` write instead of losing the job.
pub fn spawn(
    store: Arc<dyn JobStore>,
    upstream: Arc<dyn PredictionService>,
    policy: PollPolicy,
    job_id: Uuid,
    request: GenerateRequest,
) {
    let watchdog_store = Arc::clone(&store);
    let task = tokio::spawn(run(store, upstream, policy, job_id, request));

    tokio::spawn(async move {
        if task.await.is_err() {
            tracing::error!(job_id = %job_id, "generation task panicked");
            metrics::counter!("generation_jobs_failed").increment(1);
            write_record(&*watchdog_store, job_id, JobRecord::failed()).await;
        }
    });
}

/// Drive one job from start call to terminal record.
pub async fn run(
    store: Arc<dyn JobStore>,
    upstream: Arc<dyn PredictionService>,
    policy: PollPolicy,
    job_id: Uuid,
    request: GenerateRequest,
) {
    let input = PredictionInput {
        image: request.image_url,
        clothing: request.theme.clothing(),
        prompt: format!("a person wearing {}", request.prompt),
    };

    // Single start attempt: any failure here is terminal for the job.
    let started = match upstream.start(&input).await {
        Ok(started) => started,
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "failed to start prediction");
            metrics::counter!("generation_jobs_failed").increment(1);
            write_record(&*store, job_id, JobRecord::failed()).await;
            return;
        }
    };

    tracing::info!(job_id = %job_id, "prediction started, polling for result");
    poll_until_terminal(&*store, &*upstream, policy, job_id, &started.poll_url).await;
}

/// Bounded poll loop: `polling -> completed | failed`.
///
/// Transport or parse errors during an attempt are immediately fatal; only a
/// still-running upstream status consumes the attempt budget.
async fn poll_until_terminal(
    store: &dyn JobStore,
    upstream: &dyn PredictionService,
    policy: PollPolicy,
    job_id: Uuid,
    poll_url: &str,
) {
    for attempt in 1..=policy.max_attempts {
        match upstream.poll(poll_url).await {
            Ok(PollOutcome::Succeeded(output)) => {
                tracing::info!(job_id = %job_id, attempt, "prediction succeeded");
                metrics::counter!("generation_jobs_completed").increment(1);
                metrics::histogram!("generation_poll_attempts").record(f64::from(attempt));
                write_record(store, job_id, JobRecord::completed(output)).await;
                return;
            }
            Ok(PollOutcome::Failed) => {
                tracing::warn!(job_id = %job_id, attempt, "prediction failed upstream");
                metrics::counter!("generation_jobs_failed").increment(1);
                write_record(store, job_id, JobRecord::failed()).await;
                return;
            }
            Ok(PollOutcome::Pending) => {
                tracing::debug!(job_id = %job_id, attempt, "prediction still running");
                sleep(policy.interval).await;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, attempt, error = %e, "poll attempt failed");
                metrics::counter!("generation_jobs_failed").increment(1);
                write_record(store, job_id, JobRecord::failed()).await;
                return;
            }
        }
    }

    tracing::warn!(
        job_id = %job_id,
        max_attempts = policy.max_attempts,
        "poll attempt budget exhausted"
    );
    metrics::counter!("generation_jobs_failed").increment(1);
    write_record(store, job_id, JobRecord::failed()).await;
}

/// Record writes inside the detached task have no caller to report to; a
/// store failure here can only be logged.
async fn write_record(store: &dyn JobStore, job_id: Uuid, record: JobRecord) {
    if let Err(e) = store.put(job_id, &record).await {
        tracing::error!(job_id = %job_id, error = %e, "failed to write job record");
    }
}
