//! Redis Streams broker.

use std::time::Duration;

use async_trait::async_trait;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tracing::{debug, info, warn};

use docmill_models::{JobMessage, Operation};

use crate::error::{QueueError, QueueResult};

/// Field under which the serialized [`JobMessage`] is stored in a stream entry.
const BODY_FIELD: &str = "body";

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Consumer group shared by all workers of an operation
    pub consumer_group: String,
    /// How long a fetch blocks waiting for a new delivery
    pub block_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            consumer_group: "docmill:workers".to_string(),
            block_timeout: Duration::from_secs(5),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP")
                .unwrap_or_else(|_| "docmill:workers".to_string()),
            block_timeout: Duration::from_secs(
                std::env::var("QUEUE_BLOCK_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        }
    }
}

/// Producer-side broker contract: persist a dispatch for at-least-once
/// delivery. Failures surface synchronously so the producer can fail the job
/// instead of leaving it pending with no queued message.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn enqueue(&self, operation: Operation, message: &JobMessage) -> QueueResult<String>;
}

/// One in-flight delivery. Must be acknowledged after the job's terminal
/// status is durably committed, and not before.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Stream entry id assigned by the broker.
    pub stream_id: String,
    pub message: JobMessage,
}

/// Redis Streams implementation of the broker binding.
///
/// An explicitly owned connection handle: opened at startup and injected into
/// the components that publish or consume.
pub struct RedisBroker {
    client: redis::Client,
    config: QueueConfig,
}

impl RedisBroker {
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env())
    }

    /// Create the operation's consumer group if it does not exist yet.
    pub async fn ensure_group(&self, operation: Operation) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(operation.queue_name())
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!(
                queue = operation.queue_name(),
                group = %self.config.consumer_group,
                "Created consumer group"
            ),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(queue = operation.queue_name(), "Consumer group already exists");
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Fetch at most one delivery for this consumer.
    ///
    /// `recover` first re-reads this consumer's own unacknowledged entries
    /// (redelivery after a crash between dequeue and ack); a normal fetch
    /// blocks up to the configured timeout waiting for a new entry. Returns
    /// `None` when the queue stayed empty.
    pub async fn fetch(
        &self,
        operation: Operation,
        consumer: &str,
        recover: bool,
    ) -> QueueResult<Option<Delivery>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let mut options = StreamReadOptions::default()
            .group(&self.config.consumer_group, consumer)
            .count(1);
        let id = if recover {
            "0"
        } else {
            options = options.block(self.config.block_timeout.as_millis() as usize);
            ">"
        };

        let reply: StreamReadReply = conn
            .xread_options(&[operation.queue_name()], &[id], &options)
            .await?;

        let entry = reply
            .keys
            .into_iter()
            .flat_map(|key| key.ids)
            .next();

        let Some(entry) = entry else {
            return Ok(None);
        };

        let body: String = entry
            .get(BODY_FIELD)
            .ok_or_else(|| QueueError::malformed(&entry.id, "missing body field"))?;
        let message: JobMessage = serde_json::from_str(&body)
            .map_err(|e| QueueError::malformed(&entry.id, e.to_string()))?;

        debug!(
            queue = operation.queue_name(),
            stream_id = %entry.id,
            job_id = %message.job_id,
            "Fetched delivery"
        );

        Ok(Some(Delivery {
            stream_id: entry.id,
            message,
        }))
    }

    /// Acknowledge a delivery and drop it from the stream.
    pub async fn ack(&self, operation: Operation, delivery: &Delivery) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        redis::cmd("XACK")
            .arg(operation.queue_name())
            .arg(&self.config.consumer_group)
            .arg(&delivery.stream_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(operation.queue_name())
            .arg(&delivery.stream_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!(stream_id = %delivery.stream_id, "Acknowledged delivery");
        Ok(())
    }

    /// Number of entries currently in the operation's stream.
    pub async fn len(&self, operation: Operation) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = conn.xlen(operation.queue_name()).await?;
        Ok(len)
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn enqueue(&self, operation: Operation, message: &JobMessage) -> QueueResult<String> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(message)?;

        let stream_id: String = redis::cmd("XADD")
            .arg(operation.queue_name())
            .arg("*")
            .arg(BODY_FIELD)
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        info!(
            queue = operation.queue_name(),
            job_id = %message.job_id,
            stream_id = %stream_id,
            "Enqueued job"
        );

        Ok(stream_id)
    }
}
