//! Notification dispatch pipeline.
//!
//! - [`channels`]: the `ChannelSender` capability and the email/telegram senders
//! - [`registry`]: channel name → sender lookup
//! - [`dispatch`]: concurrent fan-out to every requested channel and outcome aggregation
//! - [`status`] / [`store`]: the request status state machine and its persistence

pub mod channels;
pub mod dispatch;
pub mod registry;
pub mod status;
pub mod store;
