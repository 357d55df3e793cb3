use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::generation::{GenerateRequest, GenerateResponse};
use crate::models::job::JobRecord;
use crate::services::generation;
use crate::services::ratelimit::Admission;

/// POST /generate — admit, record the job as queued, fire off generation.
///
/// The job id is only returned once the initial `queued` write has succeeded,
/// so every id a client ever sees resolves in the store. The generation task
/// is spawned detached and never awaited here.
pub async fn submit_generation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let identity = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if let Admission::Denied { limit, remaining } = state.limiter.admit(identity).await {
        return Err(ApiError::AdmissionDenied { limit, remaining });
    }

    let Json(request) = body.map_err(|e| ApiError::Validation(e.body_text()))?;

    let job_id = Uuid::new_v4();
    state.store.put(job_id, &JobRecord::queued()).await?;

    metrics::counter!("generation_jobs_total").increment(1);
    tracing::info!(job_id = %job_id, theme = ?request.theme, "generation job submitted");

    generation::spawn(
        state.store.clone(),
        state.upstream.clone(),
        state.poll_policy,
        job_id,
        request,
    );

    Ok(Json(GenerateResponse { job_id }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    job_id: Option<String>,
}

/// GET /generate?jobId=<id> — read-only status lookup.
///
/// Returns the stored `{status, result}` record verbatim. An id that never
/// existed (or has expired from the store) is a 404, which is distinct from a
/// job that reached the `failed` status.
pub async fn get_job_status(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<JobRecord>, ApiError> {
    let job_id = query
        .job_id
        .ok_or_else(|| ApiError::Validation("Job ID is required".into()))?;

    // Ids are minted as UUIDs; anything else cannot name a stored job.
    let job_id = Uuid::parse_str(&job_id).map_err(|_| ApiError::NotFound)?;

    match state.store.get(job_id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::NotFound),
    }
}
