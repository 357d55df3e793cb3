use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::store::StoreError;

/// Client-facing error taxonomy for the HTTP surface.
///
/// Failures inside the detached generation task never travel through this
/// type; they are recorded as a terminal `failed` job record and discovered
/// by the client through polling.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Too many uploads in 1 day. Please try again in 24 hours.")]
    AdmissionDenied { limit: u32, remaining: u32 },

    #[error("{0}")]
    Validation(String),

    #[error("Job not found")]
    NotFound,

    #[error("Internal Server Error")]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::AdmissionDenied { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Store(e) => {
                tracing::error!(error = %e, "job store error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(ErrorBody {
            error: self.to_string(),
        });

        let mut response = (status, body).into_response();

        if let ApiError::AdmissionDenied { limit, remaining } = self {
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
        }

        response
    }
}
