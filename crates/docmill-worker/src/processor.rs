//! Shared job processing skeleton.
//!
//! All three operations follow the same shape: mark the job processing,
//! run the transform step with per-input failure capture, then commit one
//! aggregate outcome. Store failures propagate to the executor so the
//! delivery stays unacknowledged and is retried.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use docmill_models::{JobMessage, JobStatus, Operation};
use docmill_pdf::{convert_to_pdf, derive_pdf_path, merge_into_pdf, split_page_range};
use docmill_store::{JobStore, StoreError};

use crate::error::WorkerResult;

/// Result of the transform step, before the aggregate decision.
#[derive(Debug, Default)]
struct Outcome {
    output_paths: Vec<String>,
    failures: Vec<String>,
}

/// Process one delivery end to end. Returns `Ok` when the terminal status is
/// durably committed (the caller may then acknowledge), `Err` when the store
/// could not be updated (the caller must leave the delivery unacknowledged).
pub async fn process_message(store: &dyn JobStore, msg: &JobMessage) -> WorkerResult<()> {
    let job = match store.get(&msg.job_id).await {
        Ok(job) => job,
        Err(StoreError::NotFound(_)) => {
            // The message outlived its record; drop it instead of redelivering
            // forever.
            warn!(job_id = %msg.job_id, "Delivery references an unknown job, dropping");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // Redelivery after a commit-then-crash: the terminal outcome is already
    // recorded, re-running would only duplicate work.
    if job.status.is_terminal() {
        info!(job_id = %msg.job_id, status = %job.status, "Job already terminal, skipping");
        return Ok(());
    }

    if job.status == JobStatus::Pending {
        store
            .update_status(&msg.job_id, JobStatus::Processing, &[], None)
            .await?;
    }

    let outcome = if msg.input_paths.is_empty() {
        Outcome {
            failures: vec!["no input files in dispatch".to_string()],
            ..Outcome::default()
        }
    } else {
        run_operation(msg).await
    };

    // Aggregate policy: any failed input fails the whole job.
    if outcome.failures.is_empty() {
        info!(
            job_id = %msg.job_id,
            outputs = outcome.output_paths.len(),
            "Job completed"
        );
        store
            .update_status(
                &msg.job_id,
                JobStatus::Completed,
                &outcome.output_paths,
                None,
            )
            .await?;
    } else {
        let message = outcome.failures.join("; ");
        warn!(job_id = %msg.job_id, error = %message, "Job failed");
        store
            .update_status(&msg.job_id, JobStatus::Failed, &[], Some(&message))
            .await?;
    }

    Ok(())
}

/// Run the operation-specific transform step.
async fn run_operation(msg: &JobMessage) -> Outcome {
    match msg.operation {
        Operation::Convert => run_convert(msg).await,
        Operation::Merge => run_merge(msg).await,
        Operation::Split => run_split(msg).await,
    }
}

/// Convert each input independently; a failed input does not stop its
/// siblings.
async fn run_convert(msg: &JobMessage) -> Outcome {
    let mut outcome = Outcome::default();

    for (index, input) in msg.input_paths.iter().enumerate() {
        let input_path = Path::new(input);
        let output_path = derive_pdf_path(input_path);

        match convert_to_pdf(input_path, &output_path).await {
            Ok(()) => outcome
                .output_paths
                .push(output_path.display().to_string()),
            Err(e) => {
                let name = msg
                    .original_file_names
                    .get(index)
                    .map(String::as_str)
                    .unwrap_or(input);
                warn!(job_id = %msg.job_id, input = %input, error = %e, "Input failed to convert");
                outcome.failures.push(format!("{name}: {e}"));
            }
        }
    }

    outcome
}

async fn run_merge(msg: &JobMessage) -> Outcome {
    let mut outcome = Outcome::default();
    let output = output_path_for(msg, "merged");
    let inputs: Vec<PathBuf> = msg.input_paths.iter().map(PathBuf::from).collect();

    let result = {
        let output = output.clone();
        tokio::task::spawn_blocking(move || merge_into_pdf(&inputs, &output)).await
    };

    match result {
        Ok(Ok(pages)) => {
            info!(job_id = %msg.job_id, pages, "Merged inputs");
            outcome.output_paths.push(output.display().to_string());
        }
        Ok(Err(e)) => outcome.failures.push(format!("merge: {e}")),
        Err(e) => outcome.failures.push(format!("merge: {e}")),
    }

    outcome
}

async fn run_split(msg: &JobMessage) -> Outcome {
    let mut outcome = Outcome::default();

    let Some(range) = msg.split_range else {
        outcome.failures.push("split: missing page range".to_string());
        return outcome;
    };

    let input = PathBuf::from(&msg.input_paths[0]);
    let output = output_path_for(msg, "split");

    let result = {
        let output = output.clone();
        tokio::task::spawn_blocking(move || split_page_range(&input, &output, range)).await
    };

    match result {
        Ok(Ok(pages)) => {
            info!(job_id = %msg.job_id, pages, "Extracted page range");
            outcome.output_paths.push(output.display().to_string());
        }
        Ok(Err(e)) => outcome.failures.push(format!("split: {e}")),
        Err(e) => outcome.failures.push(format!("split: {e}")),
    }

    outcome
}

/// Deterministic single-output location inside the job's directory: derived
/// from the job id alone, so a redelivered message overwrites the previous
/// attempt's file instead of adding another.
fn output_path_for(msg: &JobMessage, prefix: &str) -> PathBuf {
    let dir = Path::new(&msg.input_paths[0])
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(format!("{prefix}_{}.pdf", msg.job_id))
}
