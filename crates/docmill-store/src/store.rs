//! Job repository trait and SQLite implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;
use tracing::debug;

use docmill_models::{Job, JobDraft, JobId, JobStatus, Operation, SplitRange};

use crate::error::{StoreError, StoreResult};

/// Job store contract.
///
/// `update_status` must be atomic with respect to concurrent readers and is
/// guarded by the status state machine: moves that the machine forbids fail
/// with [`StoreError::InvalidTransition`] and mutate nothing.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a validated draft as a new pending job.
    async fn create(&self, draft: JobDraft) -> StoreResult<Job>;

    /// Fetch a job by id.
    async fn get(&self, id: &JobId) -> StoreResult<Job>;

    /// Commit a status change together with its outputs and error message.
    async fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        output_paths: &[String],
        error_message: Option<&str>,
    ) -> StoreResult<()>;
}

/// SQLite-backed implementation of [`JobStore`].
#[derive(Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Open (or create) the database at `url`, e.g. `sqlite:data/docmill.db`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init().await?;
        Ok(store)
    }

    /// Create the schema if it does not exist.
    pub async fn init(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS job (
                id                  TEXT PRIMARY KEY,
                owner_id            TEXT NOT NULL,
                operation           TEXT NOT NULL,
                input_paths         TEXT NOT NULL,
                original_file_names TEXT NOT NULL,
                split_start         INTEGER,
                split_end           INTEGER,
                status              TEXT NOT NULL,
                output_paths        TEXT NOT NULL,
                error_message       TEXT,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_job_owner ON job (owner_id, created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, draft: JobDraft) -> StoreResult<Job> {
        let job = draft.into_job();
        let row = JobRow::from_job(&job)?;

        sqlx::query(
            r#"
            INSERT INTO job (
                id, owner_id, operation, input_paths, original_file_names,
                split_start, split_end, status, output_paths, error_message,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.owner_id)
        .bind(&row.operation)
        .bind(&row.input_paths)
        .bind(&row.original_file_names)
        .bind(row.split_start)
        .bind(row.split_end)
        .bind(&row.status)
        .bind(&row.output_paths)
        .bind(&row.error_message)
        .bind(&row.created_at)
        .bind(&row.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(job_id = %job.id, operation = %job.operation, "Created job record");
        Ok(job)
    }

    async fn get(&self, id: &JobId) -> StoreResult<Job> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM job WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;

        row.into_job()
    }

    async fn update_status(
        &self,
        id: &JobId,
        status: JobStatus,
        output_paths: &[String],
        error_message: Option<&str>,
    ) -> StoreResult<()> {
        let current = self.get(id).await?;

        if !current.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        let outputs_json = serde_json::to_string(output_paths)
            .map_err(|e| StoreError::corrupt(id.as_str(), e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        // Guarded against a concurrent writer racing past the transition
        // check; all fields land in one statement so readers never see a
        // torn status/output combination.
        let result = sqlx::query(
            r#"
            UPDATE job
            SET status = ?, output_paths = ?, error_message = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(status.as_str())
        .bind(&outputs_json)
        .bind(error_message)
        .bind(&now)
        .bind(id.as_str())
        .bind(current.status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::InvalidTransition {
                from: current.status,
                to: status,
            });
        }

        debug!(job_id = %id, status = %status, "Committed job status");
        Ok(())
    }
}

/// Raw database row, JSON blobs for the path lists.
#[derive(Debug, Clone, FromRow)]
struct JobRow {
    id: String,
    owner_id: String,
    operation: String,
    input_paths: String,
    original_file_names: String,
    split_start: Option<i64>,
    split_end: Option<i64>,
    status: String,
    output_paths: String,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
}

impl JobRow {
    fn from_job(job: &Job) -> StoreResult<Self> {
        let encode = |v: &Vec<String>| {
            serde_json::to_string(v)
                .map_err(|e| StoreError::corrupt(job.id.as_str(), e.to_string()))
        };

        Ok(Self {
            id: job.id.as_str().to_string(),
            owner_id: job.owner_id.clone(),
            operation: job.operation.as_str().to_string(),
            input_paths: encode(&job.input_paths)?,
            original_file_names: encode(&job.original_file_names)?,
            split_start: job.split_range.map(|r| r.start as i64),
            split_end: job.split_range.map(|r| r.end as i64),
            status: job.status.as_str().to_string(),
            output_paths: encode(&job.output_paths)?,
            error_message: job.error_message.clone(),
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
        })
    }

    fn into_job(self) -> StoreResult<Job> {
        let id = self.id.clone();
        let corrupt = |reason: String| StoreError::corrupt(id.as_str(), reason);

        let operation = Operation::from_str(&self.operation)
            .map_err(|e| corrupt(e.to_string()))?;
        let status = JobStatus::from_str(&self.status).map_err(|e| corrupt(e.to_string()))?;

        let input_paths: Vec<String> =
            serde_json::from_str(&self.input_paths).map_err(|e| corrupt(e.to_string()))?;
        let original_file_names: Vec<String> = serde_json::from_str(&self.original_file_names)
            .map_err(|e| corrupt(e.to_string()))?;
        let output_paths: Vec<String> =
            serde_json::from_str(&self.output_paths).map_err(|e| corrupt(e.to_string()))?;

        let split_range = match (self.split_start, self.split_end) {
            (Some(start), Some(end)) => Some(SplitRange::new(start as u32, end as u32)),
            _ => None,
        };

        let parse_ts = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| corrupt(e.to_string()))
        };

        Ok(Job {
            id: JobId::from(self.id.clone()),
            owner_id: self.owner_id,
            operation,
            input_paths,
            original_file_names,
            split_range,
            status,
            output_paths,
            error_message: self.error_message,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}
