//! Worker configuration.

use std::str::FromStr;

use docmill_models::Operation;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration. One process serves exactly one operation.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// The operation this worker consumes
    pub operation: Operation,
    /// Stable consumer name within the operation's group; reusing the same
    /// name after a restart re-delivers this consumer's unacknowledged
    /// messages.
    pub consumer_name: String,
    /// Job store database URL
    pub database_url: String,
}

impl WorkerConfig {
    /// Create config from environment variables. `WORKER_OPERATION` is
    /// required (`convert`, `merge` or `split`).
    pub fn from_env() -> WorkerResult<Self> {
        let operation = std::env::var("WORKER_OPERATION")
            .map_err(|_| WorkerError::config("WORKER_OPERATION is not set"))?;
        let operation = Operation::from_str(&operation)
            .map_err(|e| WorkerError::config(e.to_string()))?;

        let consumer_name = std::env::var("WORKER_CONSUMER")
            .unwrap_or_else(|_| format!("worker-{operation}"));

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:data/docmill.db".to_string());

        Ok(Self {
            operation,
            consumer_name,
            database_url,
        })
    }
}
