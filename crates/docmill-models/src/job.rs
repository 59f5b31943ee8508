//! Job record, status state machine and operation definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Unique job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a new random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Transformation kind requested by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Convert each input to PDF
    Convert,
    /// Concatenate all inputs into one PDF
    Merge,
    /// Extract a page range from a single PDF
    Split,
}

impl Operation {
    pub const ALL: &'static [Operation] = &[Operation::Convert, Operation::Merge, Operation::Split];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Convert => "convert",
            Operation::Merge => "merge",
            Operation::Split => "split",
        }
    }

    /// Name of the durable queue carrying this operation's dispatches.
    pub fn queue_name(&self) -> &'static str {
        match self {
            Operation::Convert => "docmill:jobs:convert",
            Operation::Merge => "docmill:jobs:merge",
            Operation::Split => "docmill:jobs:split",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operation {
    type Err = OperationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "convert" => Ok(Operation::Convert),
            "merge" => Ok(Operation::Merge),
            "split" => Ok(Operation::Split),
            _ => Err(OperationParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown operation: {0}")]
pub struct OperationParseError(String);

/// Job lifecycle status.
///
/// Transitions move only forward: `Pending → Processing → {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match self {
            JobStatus::Pending => matches!(
                next,
                JobStatus::Processing | JobStatus::Completed | JobStatus::Failed
            ),
            JobStatus::Processing => matches!(next, JobStatus::Completed | JobStatus::Failed),
            JobStatus::Completed | JobStatus::Failed => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown job status: {0}")]
pub struct StatusParseError(String);

/// Inclusive 1-based page bounds for a split operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRange {
    pub start: u32,
    pub end: u32,
}

impl SplitRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Bounds are valid when `0 < start <= end`.
    pub fn is_valid(&self) -> bool {
        self.start > 0 && self.start <= self.end
    }
}

/// A persisted record of one requested transformation and its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub owner_id: String,
    pub operation: Operation,
    /// Absolute input file locations, owned by this job. Workers read only.
    pub input_paths: Vec<String>,
    /// Display names parallel to `input_paths`.
    pub original_file_names: Vec<String>,
    /// Present only for split jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_range: Option<SplitRange>,
    pub status: JobStatus,
    /// Produced file locations; empty until the job completes.
    pub output_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Producer-side input for creating a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDraft {
    pub owner_id: String,
    pub operation: Operation,
    pub input_paths: Vec<String>,
    pub original_file_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_range: Option<SplitRange>,
}

impl JobDraft {
    /// Validate the draft before any record is created.
    pub fn validate(&self) -> Result<(), JobValidationError> {
        if self.owner_id.trim().is_empty() {
            return Err(JobValidationError::MissingOwner);
        }
        if self.input_paths.is_empty() {
            return Err(JobValidationError::EmptyInputs);
        }
        if self.input_paths.len() != self.original_file_names.len() {
            return Err(JobValidationError::NameMismatch {
                inputs: self.input_paths.len(),
                names: self.original_file_names.len(),
            });
        }
        match (self.operation, self.split_range) {
            (Operation::Split, None) => Err(JobValidationError::MissingSplitRange),
            (Operation::Split, Some(range)) if !range.is_valid() => {
                Err(JobValidationError::InvalidSplitRange {
                    start: range.start,
                    end: range.end,
                })
            }
            _ => Ok(()),
        }
    }

    /// Materialize the draft into a pending job with a fresh id.
    pub fn into_job(self) -> Job {
        let now = Utc::now();
        Job {
            id: JobId::new(),
            owner_id: self.owner_id,
            operation: self.operation,
            input_paths: self.input_paths,
            original_file_names: self.original_file_names,
            split_range: self.split_range,
            status: JobStatus::Pending,
            output_paths: Vec::new(),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Rejections raised before a job record exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobValidationError {
    #[error("owner_id is required")]
    MissingOwner,

    #[error("at least one input file is required")]
    EmptyInputs,

    #[error("input_paths ({inputs}) and original_file_names ({names}) must be parallel")]
    NameMismatch { inputs: usize, names: usize },

    #[error("split requires a page range")]
    MissingSplitRange,

    #[error("invalid split range: start={start}, end={end}")]
    InvalidSplitRange { start: u32, end: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(operation: Operation) -> JobDraft {
        JobDraft {
            owner_id: "user-1".to_string(),
            operation,
            input_paths: vec!["/data/user-1/a.docx".to_string()],
            original_file_names: vec!["a.docx".to_string()],
            split_range: None,
        }
    }

    #[test]
    fn status_moves_only_forward() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Processing));
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn draft_validation_rejects_empty_inputs() {
        let mut d = draft(Operation::Convert);
        d.input_paths.clear();
        d.original_file_names.clear();
        assert_eq!(d.validate(), Err(JobValidationError::EmptyInputs));
    }

    #[test]
    fn draft_validation_rejects_missing_owner() {
        let mut d = draft(Operation::Convert);
        d.owner_id = "  ".to_string();
        assert_eq!(d.validate(), Err(JobValidationError::MissingOwner));
    }

    #[test]
    fn draft_validation_requires_parallel_names() {
        let mut d = draft(Operation::Merge);
        d.original_file_names.clear();
        assert!(matches!(
            d.validate(),
            Err(JobValidationError::NameMismatch { .. })
        ));
    }

    #[test]
    fn split_requires_valid_range() {
        let mut d = draft(Operation::Split);
        assert_eq!(d.validate(), Err(JobValidationError::MissingSplitRange));

        d.split_range = Some(SplitRange::new(0, 3));
        assert!(matches!(
            d.validate(),
            Err(JobValidationError::InvalidSplitRange { .. })
        ));

        d.split_range = Some(SplitRange::new(5, 2));
        assert!(matches!(
            d.validate(),
            Err(JobValidationError::InvalidSplitRange { .. })
        ));

        d.split_range = Some(SplitRange::new(2, 5));
        assert!(d.validate().is_ok());
    }

    #[test]
    fn draft_becomes_pending_job_with_empty_outputs() {
        let job = draft(Operation::Convert).into_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.output_paths.is_empty());
        assert!(job.error_message.is_none());
    }

    #[test]
    fn operation_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), *op);
        }
        assert!("rotate".parse::<Operation>().is_err());
    }
}
