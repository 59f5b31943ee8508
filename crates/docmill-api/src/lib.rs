//! Axum HTTP API server.
//!
//! This crate provides:
//! - The job producer endpoints (convert/merge/split)
//! - Job queries and the SSE status stream
//! - Result downloads (single file or zip archive)

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
