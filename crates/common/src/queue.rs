//! Durable notification queue on top of a Redis list.
//!
//! Producers `LPUSH` serialized requests onto the queue key. Consumers move one
//! message at a time into a processing list with `BLMOVE` and remove it with
//! `LREM` once handled. A message left in the processing list by a crashed
//! consumer is pushed back onto the queue by [`NotificationQueue::recover_unacked`],
//! which gives at-least-once delivery.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::AppError;
use crate::types::NotificationRequest;

/// A message received from the queue and not yet acknowledged.
#[derive(Debug, Clone)]
pub struct Delivery {
    raw: String,
}

impl Delivery {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decode the payload into a notification request.
    pub fn decode(&self) -> Result<NotificationRequest, serde_json::Error> {
        serde_json::from_str(&self.raw)
    }
}

/// Producer side of the queue, injected into the ingestion layer.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Serialize and enqueue a request.
    async fn publish(&self, request: &NotificationRequest) -> Result<(), AppError>;
}

/// Handle to the Redis-backed notification queue.
#[derive(Clone)]
pub struct NotificationQueue {
    redis: ConnectionManager,
    queue_key: String,
    processing_key: String,
}

impl NotificationQueue {
    pub fn new(redis: ConnectionManager, queue_name: &str) -> Self {
        Self {
            redis,
            queue_key: queue_name.to_string(),
            processing_key: format!("{}:processing", queue_name),
        }
    }

    pub fn queue_key(&self) -> &str {
        &self.queue_key
    }

    /// Wait up to `timeout` for the next message.
    ///
    /// Returns `None` when the timeout elapses with an empty queue.
    pub async fn receive(&self, timeout: Duration) -> Result<Option<Delivery>, AppError> {
        let mut conn = self.redis.clone();

        // BLMOVE queue processing RIGHT LEFT timeout
        // LPUSH + pop from the right keeps FIFO order
        let raw: Option<String> = redis::cmd("BLMOVE")
            .arg(&self.queue_key)
            .arg(&self.processing_key)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(timeout.as_secs_f64())
            .query_async(&mut conn)
            .await?;

        Ok(raw.map(|raw| Delivery { raw }))
    }

    /// Remove a handled message from the processing list.
    pub async fn ack(&self, delivery: &Delivery) -> Result<(), AppError> {
        let mut conn = self.redis.clone();
        let removed: i64 = conn.lrem(&self.processing_key, 1, delivery.raw()).await?;

        if removed == 0 {
            tracing::warn!(
                processing = %self.processing_key,
                "Acknowledged message was not present in the processing list"
            );
        }
        Ok(())
    }

    /// Push every unacknowledged message back onto the queue.
    ///
    /// Only safe to call while no other consumer is running against the same queue.
    pub async fn recover_unacked(&self) -> Result<usize, AppError> {
        let mut conn = self.redis.clone();
        let mut recovered = 0usize;

        loop {
            // Newest first onto the consuming end, so the oldest is received next
            let moved: Option<String> = redis::cmd("LMOVE")
                .arg(&self.processing_key)
                .arg(&self.queue_key)
                .arg("LEFT")
                .arg("RIGHT")
                .query_async(&mut conn)
                .await?;

            if moved.is_none() {
                break;
            }
            recovered += 1;
        }

        if recovered > 0 {
            tracing::warn!(
                recovered,
                queue = %self.queue_key,
                "Requeued unacknowledged notifications"
            );
        }
        Ok(recovered)
    }

    /// Number of messages waiting in the queue.
    pub async fn depth(&self) -> Result<usize, AppError> {
        let mut conn = self.redis.clone();
        let len: usize = conn.llen(&self.queue_key).await?;
        Ok(len)
    }
}

#[async_trait]
impl NotificationPublisher for NotificationQueue {
    async fn publish(&self, request: &NotificationRequest) -> Result<(), AppError> {
        let body = serde_json::to_string(request)?;
        let mut conn = self.redis.clone();
        conn.lpush::<_, _, ()>(&self.queue_key, body).await?;

        tracing::debug!(id = %request.id, queue = %self.queue_key, "Notification published");
        Ok(())
    }
}
