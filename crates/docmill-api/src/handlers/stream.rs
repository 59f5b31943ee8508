//! SSE status stream.
//!
//! A read-only, best-effort mirror of store state: the job record is polled
//! on a fixed interval and pushed as `status` events until a terminal status
//! or an error closes the stream. Dropping the connection drops the stream
//! and its timer with it.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use futures_util::Stream;
use tracing::warn;

use docmill_models::{JobId, StatusEvent, StreamError};
use docmill_store::StoreError;

use crate::state::AppState;

/// Interval between store polls.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// GET /api/jobs/:job_id/stream
pub async fn stream_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let store = state.store.clone();
    let id = JobId::from(job_id);

    let stream = async_stream::stream! {
        let mut interval = tokio::time::interval(POLL_INTERVAL);

        loop {
            // First tick fires immediately, so subscribers get a snapshot on
            // connect.
            interval.tick().await;

            match store.get(&id).await {
                Ok(job) => {
                    let snapshot = StatusEvent::from_job(&job);
                    let data = serde_json::to_string(&snapshot).unwrap_or_default();
                    yield Ok::<_, Infallible>(Event::default().event("status").data(data));

                    if job.status.is_terminal() {
                        break;
                    }
                }
                Err(StoreError::NotFound(_)) => {
                    let payload = StreamError::new("Job not found");
                    let data = serde_json::to_string(&payload).unwrap_or_default();
                    yield Ok(Event::default().event("error").data(data));
                    break;
                }
                Err(e) => {
                    warn!(job_id = %id, error = %e, "Status poll failed");
                    let payload = StreamError::new("Status lookup failed");
                    let data = serde_json::to_string(&payload).unwrap_or_default();
                    yield Ok(Event::default().event("error").data(data));
                    break;
                }
            }
        }
    };

    Sse::new(stream)
}
