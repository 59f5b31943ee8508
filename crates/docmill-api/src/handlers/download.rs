//! Result assembly: single-file and archive downloads.

use std::io::Write;
use std::path::{Path as FsPath, PathBuf};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::Response;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use docmill_models::{Job, JobId, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/jobs/:job_id/files/:file_index
///
/// Stream one output file by index.
pub async fn download_file(
    State(state): State<AppState>,
    Path((job_id, file_index)): Path<(String, usize)>,
) -> ApiResult<Response> {
    let job = completed_job(&state, &job_id).await?;

    let path = job
        .output_paths
        .get(file_index)
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    stream_file(FsPath::new(path)).await
}

/// GET /api/jobs/:job_id/files
///
/// Stream the whole result set: a single output behaves like an index-0
/// download, multiple outputs become a zip archive.
pub async fn download_all(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job = completed_job(&state, &job_id).await?;

    if job.output_paths.len() == 1 {
        return stream_file(FsPath::new(&job.output_paths[0])).await;
    }

    let paths: Vec<PathBuf> = job.output_paths.iter().map(PathBuf::from).collect();
    let (bytes, added) = tokio::task::spawn_blocking(move || build_archive(&paths))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;

    if added == 0 {
        return Err(ApiError::not_found("No files available for download"));
    }

    let archive_name = format!("{}_{}.zip", job.operation, job.id);
    info!(job_id = %job.id, entries = added, "Streaming archive");

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{archive_name}\""),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// Resolve the job and reject anything that is not ready for download.
async fn completed_job(state: &AppState, job_id: &str) -> ApiResult<Job> {
    let job = state.store.get(&JobId::from(job_id)).await?;

    if job.status != JobStatus::Completed {
        return Err(ApiError::conflict("Job not completed yet"));
    }
    if job.output_paths.is_empty() {
        return Err(ApiError::not_found("No output files found"));
    }

    Ok(job)
}

/// Stream a single file with exact length and a derived content type.
async fn stream_file(path: &FsPath) -> ApiResult<Response> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| ApiError::not_found("File not found on server"))?;

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|_| ApiError::not_found("File not found on server"))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "download".to_string());

    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(path))
        .header(header::CONTENT_LENGTH, metadata.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        )
        .body(body)
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// Build a deflate-compressed archive of every file that still exists on
/// disk, each under its base name. Vanished files are skipped with a warning.
fn build_archive(paths: &[PathBuf]) -> ApiResult<(Vec<u8>, usize)> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut archive = zip::ZipWriter::new(&mut cursor);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut added = 0usize;
    for path in paths {
        if !path.exists() {
            warn!(path = %path.display(), "Output file missing, skipping archive entry");
            continue;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("file_{added}"));

        archive
            .start_file(name, options)
            .map_err(|e| ApiError::internal(format!("Failed to add zip entry: {e}")))?;

        let bytes = std::fs::read(path)
            .map_err(|e| ApiError::internal(format!("Failed to read output file: {e}")))?;
        archive
            .write_all(&bytes)
            .map_err(|e| ApiError::internal(format!("Failed to write zip entry: {e}")))?;

        added += 1;
    }

    archive
        .finish()
        .map_err(|e| ApiError::internal(format!("Failed to finish zip: {e}")))?;

    Ok((cursor.into_inner(), added))
}

/// Suffix-to-MIME lookup for download responses.
fn content_type_for(path: &FsPath) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}
