use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::{Destination, NotificationChannel, NotificationConfig, NotificationError};

/// Telegram Bot API `sendMessage` notifier.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    channel_id: String,
    chat_id: String,
}

#[derive(Debug, Deserialize)]
struct TelegramReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotificationError::Telegram(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.telegram_api_url.trim_end_matches('/'),
                config.bot_token
            ),
            channel_id: config.channel_id.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    fn chat_for(&self, destination: Destination) -> &str {
        match destination {
            Destination::Channel => &self.channel_id,
            Destination::Chat => &self.chat_id,
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramNotifier {
    async fn send(&self, destination: Destination, text: &str) -> Result<(), NotificationError> {
        let payload = serde_json::json!({
            "chat_id": self.chat_for(destination),
            "disable_web_page_preview": true,
            "parse_mode": "markdown",
            "text": text,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::Telegram(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let reply: Option<TelegramReply> = serde_json::from_str(&body).ok();

        match reply {
            Some(TelegramReply { ok: true, .. }) if status.is_success() => Ok(()),
            Some(TelegramReply { description, .. }) => Err(NotificationError::Rejected {
                status: status.as_u16(),
                description: description.unwrap_or(body),
            }),
            None => Err(NotificationError::Rejected {
                status: status.as_u16(),
                description: body,
            }),
        }
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
