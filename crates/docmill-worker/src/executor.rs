//! Consume/execute/commit/ack loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use docmill_queue::RedisBroker;
use docmill_store::JobStore;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::processor::process_message;

/// Pause before retrying after a broker or store failure.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Serial executor with a single consumption slot: one delivery in flight at
/// a time, acknowledged only after its outcome is committed. Throughput
/// scales by running more worker processes, each with its own slot.
pub struct JobExecutor {
    config: WorkerConfig,
    broker: RedisBroker,
    store: Arc<dyn JobStore>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(config: WorkerConfig, broker: RedisBroker, store: Arc<dyn JobStore>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            broker,
            store,
            shutdown,
        }
    }

    /// Run until shutdown is signalled.
    pub async fn run(&self) -> WorkerResult<()> {
        let operation = self.config.operation;
        self.broker.ensure_group(operation).await?;

        info!(
            operation = %operation,
            consumer = %self.config.consumer_name,
            "Worker listening"
        );

        let mut shutdown_rx = self.shutdown.subscribe();
        // Start by draining our own unacknowledged deliveries from a previous
        // run of this consumer name.
        let mut recover = true;

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping worker");
                        break;
                    }
                }
                fetched = self.broker.fetch(operation, &self.config.consumer_name, recover) => {
                    match fetched {
                        Ok(Some(delivery)) => {
                            match process_message(self.store.as_ref(), &delivery.message).await {
                                Ok(()) => {
                                    if let Err(e) = self.broker.ack(operation, &delivery).await {
                                        // The outcome is committed; a lost ack
                                        // only costs a redelivery that the
                                        // terminal-status check absorbs.
                                        warn!(
                                            stream_id = %delivery.stream_id,
                                            error = %e,
                                            "Failed to acknowledge delivery"
                                        );
                                    }
                                }
                                Err(e) => {
                                    error!(
                                        job_id = %delivery.message.job_id,
                                        error = %e,
                                        "Processing failed, leaving delivery unacknowledged"
                                    );
                                    recover = true;
                                    tokio::time::sleep(RETRY_BACKOFF).await;
                                }
                            }
                        }
                        Ok(None) => {
                            recover = false;
                        }
                        Err(e) => {
                            error!(error = %e, "Fetch failed");
                            tokio::time::sleep(RETRY_BACKOFF).await;
                        }
                    }
                }
            }
        }

        info!("Worker stopped");
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
