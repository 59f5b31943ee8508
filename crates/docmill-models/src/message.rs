//! Queue message payloads.

use serde::{Deserialize, Serialize};

use crate::job::{Job, JobId, JobStatus, Operation, SplitRange};

/// The payload of one dispatch: a snapshot of the job sufficient for a worker
/// to act without re-reading the store first. Disposable after the worker
/// commits its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: JobId,
    pub owner_id: String,
    pub operation: Operation,
    pub input_paths: Vec<String>,
    pub original_file_names: Vec<String>,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_range: Option<SplitRange>,
}

impl JobMessage {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            owner_id: job.owner_id.clone(),
            operation: job.operation,
            input_paths: job.input_paths.clone(),
            original_file_names: job.original_file_names.clone(),
            status: job.status,
            split_range: job.split_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobDraft;

    #[test]
    fn message_snapshots_the_job() {
        let job = JobDraft {
            owner_id: "user-1".to_string(),
            operation: Operation::Split,
            input_paths: vec!["/data/user-1/report.pdf".to_string()],
            original_file_names: vec!["report.pdf".to_string()],
            split_range: Some(SplitRange::new(2, 4)),
        }
        .into_job();

        let msg = JobMessage::from_job(&job);
        assert_eq!(msg.job_id, job.id);
        assert_eq!(msg.operation, Operation::Split);
        assert_eq!(msg.split_range, Some(SplitRange::new(2, 4)));
        assert_eq!(msg.status, JobStatus::Pending);

        // Survives the wire
        let wire = serde_json::to_string(&msg).unwrap();
        let back: JobMessage = serde_json::from_str(&wire).unwrap();
        assert_eq!(back.input_paths, job.input_paths);
    }
}
