//! Dispatch coordinator. Fans a request out to every requested channel.
//!
//! Flow for one request:
//! 1. Mark the request `sending`
//! 2. Resolve every channel entry; spawn one task per resolved sender
//! 3. Join every task, recording exactly one outcome per entry
//! 4. Aggregate the outcomes into `sent`, `failed` or `partial` and record it
//!
//! Channel-level failures (unsupported name, provider rejection, timeout) are
//! absorbed into the aggregate status and never returned to the caller. If the
//! tracker refuses step 1 (unknown id or already terminal), nothing is sent.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use notifyhub_common::error::AppError;
use notifyhub_common::types::{NotificationRequest, NotificationStatus};

use crate::channels::{ChannelSender, SendError};
use crate::registry::ChannelRegistry;
use crate::status::StatusTracker;

/// Attempts at recording `sending` before dispatching without it.
const SENDING_WRITE_ATTEMPTS: u32 = 2;

/// Result of one channel entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub channel: String,
    pub result: Result<(), SendError>,
}

impl DispatchOutcome {
    pub fn success(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            result: Ok(()),
        }
    }

    pub fn failure(channel: impl Into<String>, error: SendError) -> Self {
        Self {
            channel: channel.into(),
            result: Err(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Combine per-entry outcomes into the final status.
///
/// All succeeded → `Sent`; none succeeded → `Failed`; otherwise `Partial`.
/// An empty outcome list counts as no successes.
pub fn aggregate(outcomes: &[DispatchOutcome]) -> NotificationStatus {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();

    if succeeded == 0 {
        NotificationStatus::Failed
    } else if succeeded == outcomes.len() {
        NotificationStatus::Sent
    } else {
        NotificationStatus::Partial
    }
}

/// What `DispatchCoordinator::process` did with a delivered request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Channels were attempted and the request reached this terminal status.
    Dispatched(NotificationStatus),
    /// A redelivered request that already reached a terminal status; nothing was sent.
    AlreadyTerminal(NotificationStatus),
    /// No record exists for the id; nothing was sent.
    UnknownId,
    /// The tracker refused to mark the request `sending` and its current status
    /// could not be confirmed as terminal; nothing was sent.
    Refused,
}

/// Entry awaiting its outcome during fan-out.
enum Pending {
    InFlight {
        channel: String,
        handle: JoinHandle<Result<(), SendError>>,
    },
    Done(DispatchOutcome),
}

#[derive(Clone)]
pub struct DispatchCoordinator {
    registry: Arc<ChannelRegistry>,
    tracker: StatusTracker,
    send_timeout: Option<Duration>,
}

impl DispatchCoordinator {
    pub fn new(registry: ChannelRegistry, tracker: StatusTracker) -> Self {
        Self {
            registry: Arc::new(registry),
            tracker,
            send_timeout: None,
        }
    }

    /// Bound every individual send; an expired send counts as a failure.
    pub fn with_send_timeout(mut self, send_timeout: Option<Duration>) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Handle a request delivered by the queue.
    ///
    /// The queue delivers at least once, so a request whose status is already
    /// terminal is skipped instead of re-sent. A request left in `sending` by an
    /// interrupted worker is dispatched again.
    pub async fn process(&self, request: &NotificationRequest) -> ProcessOutcome {
        match self.tracker.get_status(&request.id).await {
            Ok(status) if status.is_terminal() => {
                tracing::info!(
                    id = %request.id,
                    status = %status,
                    "Skipping redelivered notification, already terminal"
                );
                return ProcessOutcome::AlreadyTerminal(status);
            }
            Ok(NotificationStatus::Sending) => {
                tracing::warn!(
                    id = %request.id,
                    "Notification was left in sending, dispatching again"
                );
            }
            Ok(_) => {}
            Err(AppError::NotFound(_)) => {
                tracing::warn!(id = %request.id, "No record for notification, skipping");
                return ProcessOutcome::UnknownId;
            }
            Err(e) => {
                // Prefer a possible duplicate send over dropping the request
                tracing::error!(
                    id = %request.id,
                    error = %e,
                    "Failed to read status before dispatch, dispatching anyway"
                );
            }
        }

        match self.dispatch(request).await {
            Ok(status) => ProcessOutcome::Dispatched(status),
            Err(AppError::NotFound(_)) => ProcessOutcome::UnknownId,
            Err(e) => match self.tracker.get_status(&request.id).await {
                Ok(status) if status.is_terminal() => ProcessOutcome::AlreadyTerminal(status),
                _ => {
                    tracing::warn!(id = %request.id, error = %e, "Dispatch refused by status tracker");
                    ProcessOutcome::Refused
                }
            },
        }
    }

    /// Dispatch a request through all of its channels and record the result.
    ///
    /// Fails with `NotFound` or `Conflict`, before any channel is attempted,
    /// when the tracker refuses to mark the request `sending`. Any other status
    /// write failure is logged and leaves the stored status stale.
    pub async fn dispatch(
        &self,
        request: &NotificationRequest,
    ) -> Result<NotificationStatus, AppError> {
        tracing::info!(
            id = %request.id,
            recipient = %request.recipient,
            channels = ?request.channels,
            "Dispatching notification"
        );

        self.mark_sending(&request.id).await?;

        let outcomes = self.fan_out(request).await;
        let status = aggregate(&outcomes);
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();

        let unsupported = outcomes
            .iter()
            .filter(|o| matches!(o.result, Err(SendError::Unsupported(_))))
            .count();
        if unsupported > 0 && unsupported == outcomes.len() {
            tracing::warn!(id = %request.id, "No requested channel is supported");
        }

        tracing::info!(
            id = %request.id,
            attempted = outcomes.len(),
            succeeded,
            failed = outcomes.len() - succeeded,
            status = %status,
            "Dispatch finished"
        );

        if let Err(e) = self.tracker.set_status(&request.id, status).await {
            tracing::error!(id = %request.id, status = %status, error = %e, "Failed to record status");
        }
        Ok(status)
    }

    /// Run every channel entry concurrently and collect one outcome per entry.
    ///
    /// Outcomes are returned in request order regardless of completion order.
    pub async fn fan_out(&self, request: &NotificationRequest) -> Vec<DispatchOutcome> {
        let recipient: Arc<str> = Arc::from(request.recipient.as_str());
        let message: Arc<str> = Arc::from(request.message.as_str());

        let pending: Vec<Pending> = request
            .channels
            .iter()
            .map(|name| match self.registry.resolve(name) {
                Ok(sender) => Pending::InFlight {
                    channel: name.clone(),
                    handle: self.spawn_send(sender, recipient.clone(), message.clone()),
                },
                Err(e) => {
                    tracing::warn!(id = %request.id, channel = %name, error = %e, "Unsupported channel");
                    Pending::Done(DispatchOutcome::failure(name.clone(), e))
                }
            })
            .collect();

        let mut outcomes = Vec::with_capacity(pending.len());
        for entry in pending {
            let outcome = match entry {
                Pending::Done(outcome) => outcome,
                Pending::InFlight { channel, handle } => match handle.await {
                    Ok(result) => DispatchOutcome { channel, result },
                    Err(join_err) => {
                        DispatchOutcome::failure(channel, SendError::Aborted(join_err.to_string()))
                    }
                },
            };

            if let Err(e) = &outcome.result {
                if !matches!(e, SendError::Unsupported(_)) {
                    tracing::warn!(
                        id = %request.id,
                        channel = %outcome.channel,
                        error = %e,
                        "Channel delivery failed"
                    );
                }
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    fn spawn_send(
        &self,
        sender: Arc<dyn ChannelSender>,
        recipient: Arc<str>,
        message: Arc<str>,
    ) -> JoinHandle<Result<(), SendError>> {
        let send_timeout = self.send_timeout;

        tokio::spawn(async move {
            let send = sender.send(&recipient, &message);
            match send_timeout {
                Some(limit) => tokio::time::timeout(limit, send)
                    .await
                    .unwrap_or_else(|_| {
                        let millis = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                        Err(SendError::Timeout(millis))
                    }),
                None => send.await,
            }
        })
    }

    /// Record `sending`, retrying once on infrastructure errors.
    ///
    /// A refusal (`NotFound`, `Conflict`) is returned. If every attempt fails
    /// for another reason, the dispatch goes ahead and the status stays stale.
    async fn mark_sending(&self, id: &str) -> Result<(), AppError> {
        for attempt in 1..=SENDING_WRITE_ATTEMPTS {
            match self.tracker.set_status(id, NotificationStatus::Sending).await {
                Ok(()) => return Ok(()),
                Err(e @ (AppError::NotFound(_) | AppError::Conflict(_))) => {
                    tracing::warn!(id, error = %e, "Status tracker refused sending");
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!(id, attempt, error = %e, "Failed to record sending status");
                }
            }
        }

        tracing::warn!(id, "Dispatching without a recorded sending status");
        Ok(())
    }
}
