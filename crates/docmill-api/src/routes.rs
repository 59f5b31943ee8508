//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::download::{download_all, download_file};
use crate::handlers::jobs::{create_convert_job, create_merge_job, create_split_job, get_job};
use crate::handlers::stream::stream_job_status;
use crate::handlers::{health, ready};
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Producer
        .route("/jobs/convert", post(create_convert_job))
        .route("/jobs/merge", post(create_merge_job))
        .route("/jobs/split", post(create_split_job))
        // Queries and status stream
        .route("/jobs/:job_id", get(get_job))
        .route("/jobs/:job_id/stream", get(stream_job_status))
        // Result assembly
        .route("/jobs/:job_id/files", get(download_all))
        .route("/jobs/:job_id/files/:file_index", get(download_file));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
