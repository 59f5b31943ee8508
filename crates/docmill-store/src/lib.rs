//! Job Store: the single source of truth for job state.
//!
//! Provides the [`JobStore`] trait and its SQLite implementation. Status
//! updates are committed as one statement so concurrent readers never observe
//! a half-written combination of status and output paths.

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{JobStore, SqliteJobStore};
