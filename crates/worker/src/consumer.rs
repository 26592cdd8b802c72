use std::time::Duration;

use tokio::sync::watch;

use notifyhub_common::queue::{Delivery, NotificationQueue};
use notifyhub_notifier::dispatch::{DispatchCoordinator, ProcessOutcome};

/// Back-off after a queue error before polling again.
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// What happened to one delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Processed(ProcessOutcome),
    /// The payload could not be decoded and was dropped.
    Malformed,
}

/// Decode a delivered message and hand it to the coordinator.
pub async fn handle_delivery(coordinator: &DispatchCoordinator, delivery: &Delivery) -> Handled {
    let request = match delivery.decode() {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, payload = delivery.raw(), "Failed to parse queue message");
            return Handled::Malformed;
        }
    };

    tracing::info!(
        id = %request.id,
        recipient = %request.recipient,
        channels = ?request.channels,
        "Processing notification"
    );

    Handled::Processed(coordinator.process(&request).await)
}

/// Queue consumer that drives the dispatch coordinator one message at a time.
pub struct QueueConsumer {
    queue: NotificationQueue,
    coordinator: DispatchCoordinator,
    poll_timeout: Duration,
}

impl QueueConsumer {
    pub fn new(
        queue: NotificationQueue,
        coordinator: DispatchCoordinator,
        poll_timeout_secs: u64,
    ) -> Self {
        Self {
            queue,
            coordinator,
            poll_timeout: Duration::from_secs(poll_timeout_secs.max(1)),
        }
    }

    /// Consume until `shutdown` flips to true.
    ///
    /// Shutdown is only observed between messages, so an in-flight dispatch
    /// always runs to completion and is acknowledged.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        self.queue.recover_unacked().await?;

        tracing::info!(
            queue = %self.queue.queue_key(),
            poll_timeout_secs = self.poll_timeout.as_secs(),
            "Worker is waiting for messages..."
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                result = self.queue.receive(self.poll_timeout) => result,
                _ = shutdown.changed() => break,
            };

            let delivery = match received {
                Ok(Some(delivery)) => delivery,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive from queue, backing off");
                    tokio::select! {
                        _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                        _ = shutdown.changed() => break,
                    }
                    continue;
                }
            };

            let handled = handle_delivery(&self.coordinator, &delivery).await;
            tracing::debug!(?handled, "Message handled");

            // A failed ack leaves the message in the processing list; it is
            // redelivered on the next start and skipped once terminal.
            if let Err(e) = self.queue.ack(&delivery).await {
                tracing::error!(error = %e, "Failed to acknowledge message");
            }
        }

        tracing::info!("Shutdown signal received, consumer stopped");
        Ok(())
    }
}
