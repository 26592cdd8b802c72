//! Channel senders, one implementation per delivery medium.

pub mod email;
pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

use notifyhub_common::types::ChannelType;

pub use email::EmailSender;
pub use telegram::TelegramSender;

/// Why a single channel attempt did not deliver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// No sender is registered under the requested name.
    #[error("unsupported channel: {0}")]
    Unsupported(String),

    /// The provider answered but refused the message.
    #[error("{channel} rejected message (HTTP {status}): {body}")]
    Rejected {
        channel: ChannelType,
        status: u16,
        body: String,
    },

    /// The provider could not be reached.
    #[error("{channel} transport error: {reason}")]
    Transport { channel: ChannelType, reason: String },

    /// The attempt did not finish within the per-send timeout.
    #[error("send timed out after {0} ms")]
    Timeout(u64),

    /// The send task ended without reporting (panic or runtime shutdown).
    #[error("send task aborted: {0}")]
    Aborted(String),
}

/// A delivery medium capable of sending one message to one recipient.
///
/// Implementations make at most one attempt per call and report every ordinary
/// delivery failure through `SendError` instead of panicking.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// The medium this sender delivers through.
    fn channel_type(&self) -> ChannelType;

    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError>;
}

/// Map a non-success provider response into a `Rejected` error.
pub(crate) async fn rejected(channel: ChannelType, response: reqwest::Response) -> SendError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
    SendError::Rejected {
        channel,
        status,
        body,
    }
}

pub(crate) fn transport(channel: ChannelType, err: reqwest::Error) -> SendError {
    SendError::Transport {
        channel,
        reason: err.to_string(),
    }
}
