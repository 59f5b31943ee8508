//! Job producer and query handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use docmill_models::{Job, JobDraft, JobId, JobMessage, JobStatus, Operation, SplitRange};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Request body for the producer endpoints. The upload collaborator has
/// already persisted the files; this carries their locations and display
/// names.
#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub owner_id: String,
    pub input_paths: Vec<String>,
    pub original_file_names: Vec<String>,
    #[serde(default)]
    pub split_start: Option<u32>,
    #[serde(default)]
    pub split_end: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CreateJobResponse {
    pub message: String,
    pub job_id: String,
    pub status: JobStatus,
}

/// POST /api/jobs/convert
pub async fn create_convert_job(
    State(state): State<AppState>,
    Json(body): Json<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<CreateJobResponse>)> {
    submit(state, Operation::Convert, body).await
}

/// POST /api/jobs/merge
pub async fn create_merge_job(
    State(state): State<AppState>,
    Json(body): Json<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<CreateJobResponse>)> {
    submit(state, Operation::Merge, body).await
}

/// POST /api/jobs/split
pub async fn create_split_job(
    State(state): State<AppState>,
    Json(body): Json<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<CreateJobResponse>)> {
    submit(state, Operation::Split, body).await
}

/// GET /api/jobs/:job_id
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<Job>> {
    let job = state.store.get(&JobId::from(job_id)).await?;
    Ok(Json(job))
}

/// Shared producer path: validate, persist a pending record, enqueue the
/// dispatch. An enqueue failure forces the record to `failed` before the
/// error reaches the caller, so no job is ever left pending with no queued
/// message behind it.
async fn submit(
    state: AppState,
    operation: Operation,
    body: CreateJobRequest,
) -> ApiResult<(StatusCode, Json<CreateJobResponse>)> {
    let split_range = match (body.split_start, body.split_end) {
        (Some(start), Some(end)) => Some(SplitRange::new(start, end)),
        _ => None,
    };

    let draft = JobDraft {
        owner_id: body.owner_id,
        operation,
        input_paths: body.input_paths,
        original_file_names: body.original_file_names,
        split_range,
    };
    draft.validate()?;

    let job = state.store.create(draft).await?;
    let message = JobMessage::from_job(&job);

    if let Err(e) = state.broker.enqueue(operation, &message).await {
        error!(job_id = %job.id, error = %e, "Enqueue failed, failing the job");

        let reason = format!("Failed to queue job for processing: {e}");
        state
            .store
            .update_status(&job.id, JobStatus::Failed, &[], Some(&reason))
            .await?;

        return Err(ApiError::Dispatch {
            job_id: job.id.to_string(),
            detail: "Failed to queue job for processing".to_string(),
        });
    }

    info!(job_id = %job.id, operation = %operation, "Job created and queued");

    Ok((
        StatusCode::CREATED,
        Json(CreateJobResponse {
            message: format!("{operation} job created and queued successfully"),
            job_id: job.id.to_string(),
            status: job.status,
        }),
    ))
}
