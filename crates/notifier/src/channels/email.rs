//! Email delivery through the Resend HTTP API.
//!
//! Without an API key the sender runs in simulated mode: it logs the message,
//! waits a fixed latency and reports success.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use notifyhub_common::types::ChannelType;

use super::{ChannelSender, SendError, rejected, transport};

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_SUBJECT: &str = "New notification";
const SIMULATED_LATENCY: Duration = Duration::from_millis(300);

enum Delivery {
    Resend {
        client: reqwest::Client,
        api_url: String,
        api_key: String,
        from: String,
    },
    Simulated {
        latency: Duration,
    },
}

pub struct EmailSender {
    delivery: Delivery,
}

impl EmailSender {
    pub fn resend(client: reqwest::Client, api_key: String, from: String) -> Self {
        Self {
            delivery: Delivery::Resend {
                client,
                api_url: RESEND_API_URL.to_string(),
                api_key,
                from,
            },
        }
    }

    /// Point the Resend client at another endpoint. No effect on a simulated sender.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        if let Delivery::Resend { api_url, .. } = &mut self.delivery {
            *api_url = url.into();
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

    /// Use Resend when both the key and sender address are configured.
    pub fn from_config(
        client: reqwest::Client,
        api_key: Option<&str>,
        from: Option<&str>,
    ) -> Self {
        match (api_key, from) {
            (Some(key), Some(from)) => Self::resend(client, key.to_string(), from.to_string()),
            (Some(_), None) => {
                tracing::warn!("RESEND_API_KEY is set but EMAIL_FROM is missing; email is simulated");
                Self::simulated()
            }
            _ => Self::simulated(),
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.delivery, Delivery::Simulated { .. })
    }
}

#[async_trait]
impl ChannelSender for EmailSender {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Email
    }

    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError> {
        match &self.delivery {
            Delivery::Simulated { latency } => {
                tracing::info!(recipient, message, "[email] Sending (simulated)");
                tokio::time::sleep(*latency).await;
                tracing::info!(recipient, "[email] Delivered (simulated)");
                Ok(())
            }
            Delivery::Resend {
                client,
                api_url,
                api_key,
                from,
            } => {
                let body = json!({
                    "from": from,
                    "to": [recipient],
                    "subject": DEFAULT_SUBJECT,
                    "text": message,
                });

                let response = client
                    .post(api_url)
                    .bearer_auth(api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| transport(ChannelType::Email, e))?;

                if !response.status().is_success() {
                    return Err(rejected(ChannelType::Email, response).await);
                }

                tracing::info!(recipient, "[email] Delivered via Resend");
                Ok(())
            }
        }
    }
}
