//! Job worker.
//!
//! This crate provides:
//! - The shared processing skeleton for all three operations
//! - The consume/execute/commit/ack executor loop
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use processor::process_message;
