//! Telegram delivery through the Bot API `sendMessage` method.
//!
//! The recipient is used as the `chat_id`. Without a bot token the sender is simulated.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use notifyhub_common::types::ChannelType;

use super::{ChannelSender, SendError, rejected, transport};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const SIMULATED_LATENCY: Duration = Duration::from_millis(200);

enum Delivery {
    BotApi {
        client: reqwest::Client,
        api_base: String,
        token: String,
    },
    Simulated {
        latency: Duration,
    },
}

/// Bot API envelope; `ok` can be false even with HTTP 200.
#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramSender {
    delivery: Delivery,
}

impl TelegramSender {
    pub fn bot_api(client: reqwest::Client, token: String) -> Self {
        Self {
            delivery: Delivery::BotApi {
                client,
                api_base: TELEGRAM_API_BASE.to_string(),
                token,
            },
        }
    }

    /// Point the Bot API client at another base URL. No effect on a simulated sender.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        if let Delivery::BotApi { api_base, .. } = &mut self.delivery {
            *api_base = base.into();
        }
        self
    }

    pub fn simulated() -> Self {
        Self::simulated_with_latency(SIMULATED_LATENCY)
    }

    pub fn simulated_with_latency(latency: Duration) -> Self {
        Self {
            delivery: Delivery::Simulated { latency },
        }
    }

    pub fn from_config(client: reqwest::Client, token: Option<&str>) -> Self {
        match token {
            Some(token) => Self::bot_api(client, token.to_string()),
            None => Self::simulated(),
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.delivery, Delivery::Simulated { .. })
    }
}

#[async_trait]
impl ChannelSender for TelegramSender {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Telegram
    }

    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError> {
        match &self.delivery {
            Delivery::Simulated { latency } => {
                tracing::info!(recipient, message, "[telegram] Sending (simulated)");
                tokio::time::sleep(*latency).await;
                tracing::info!(recipient, "[telegram] Delivered (simulated)");
                Ok(())
            }
            Delivery::BotApi {
                client,
                api_base,
                token,
            } => {
                let url = format!("{}/bot{}/sendMessage", api_base, token);
                let response = client
                    .post(&url)
                    .json(&json!({ "chat_id": recipient, "text": message }))
                    .send()
                    .await
                    .map_err(|e| transport(ChannelType::Telegram, e))?;

                if !response.status().is_success() {
                    return Err(rejected(ChannelType::Telegram, response).await);
                }

                let status = response.status().as_u16();
                let envelope: BotApiResponse = response
                    .json()
                    .await
                    .map_err(|e| transport(ChannelType::Telegram, e))?;
                if !envelope.ok {
                    return Err(SendError::Rejected {
                        channel: ChannelType::Telegram,
                        status,
                        body: envelope.description.unwrap_or_default(),
                    });
                }

                tracing::info!(recipient, "[telegram] Delivered via Bot API");
                Ok(())
            }
        }
    }
}
