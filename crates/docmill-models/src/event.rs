//! Status stream event schemas.
//!
//! Two named SSE event types mirror store state to the client: `status`
//! carries the current snapshot, `error` terminates the stream.

use serde::{Deserialize, Serialize};

use crate::job::{Job, JobStatus};

/// Payload of a `status` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub status: JobStatus,
    #[serde(rename = "outputPaths")]
    pub output_paths: Vec<String>,
}

impl StatusEvent {
    pub fn from_job(job: &Job) -> Self {
        Self {
            status: job.status,
            output_paths: job.output_paths.clone(),
        }
    }
}

/// Payload of an `error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamError {
    pub error: String,
}

impl StreamError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
