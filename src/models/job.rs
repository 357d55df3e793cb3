use serde::{Deserialize, Serialize};

/// Status of a generation job.
///
/// `Completed` and `Failed` are terminal: once written, the record is never
/// modified again. The only permitted transitions are `Queued -> Completed`
/// and `Queued -> Failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// The persisted job record, stored JSON-serialized under the job id key.
///
/// `result` holds the upstream output (a URL or list of URLs) and is only
/// populated for `Completed` jobs; it serializes as `null` otherwise, which
/// is also the shape returned verbatim by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub status: JobStatus,
    pub result: Option<serde_json::Value>,
}

impl JobRecord {
    pub fn queued() -> Self {
        Self {
            status: JobStatus::Queued,
            result: None,
        }
    }

    pub fn completed(output: serde_json::Value) -> Self {
        Self {
            status: JobStatus::Completed,
            result: Some(output),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: JobStatus::Failed,
            result: None,
        }
    }
}
