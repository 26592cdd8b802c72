//! Channel registry. Resolves a channel name to its sender.
//!
//! Adding a medium means adding a `ChannelType` variant and registering a
//! sender for it; the dispatcher never inspects channel names itself.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use notifyhub_common::config::AppConfig;
use notifyhub_common::types::ChannelType;

use crate::channels::{ChannelSender, EmailSender, SendError, TelegramSender};

/// Lookup table from channel type to sender.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    senders: HashMap<ChannelType, Arc<dyn ChannelSender>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry with email and telegram senders configured from `config`.
    pub fn from_config(config: &AppConfig, client: reqwest::Client) -> Self {
        let email = EmailSender::from_config(
            client.clone(),
            config.resend_api_key.as_deref(),
            config.email_from.as_deref(),
        );
        let telegram = TelegramSender::from_config(client, config.telegram_bot_token.as_deref());

        let email_simulated = email.is_simulated();
        let telegram_simulated = telegram.is_simulated();
        let registry = Self::new()
            .with_sender(Arc::new(email))
            .with_sender(Arc::new(telegram));

        tracing::info!(
            supported = ?registry.supported(),
            email_simulated,
            telegram_simulated,
            "Channel registry configured"
        );
        registry
    }

    /// Register a sender under its own channel type, replacing any previous one.
    pub fn register(&mut self, sender: Arc<dyn ChannelSender>) {
        self.senders.insert(sender.channel_type(), sender);
    }

    pub fn with_sender(mut self, sender: Arc<dyn ChannelSender>) -> Self {
        self.register(sender);
        self
    }

    /// Resolve a channel name (case-insensitive) to its sender.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn ChannelSender>, SendError> {
        let channel_type =
            ChannelType::from_str(name).map_err(|_| SendError::Unsupported(name.to_string()))?;
        self.senders
            .get(&channel_type)
            .cloned()
            .ok_or_else(|| SendError::Unsupported(name.to_string()))
    }

    /// Channel types that currently have a registered sender.
    pub fn supported(&self) -> Vec<ChannelType> {
        let mut kinds: Vec<ChannelType> = self.senders.keys().copied().collect();
        kinds.sort_by_key(|kind| kind.as_str());
        kinds
    }
}
