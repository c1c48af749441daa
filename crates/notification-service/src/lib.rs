mod telegram;
mod templates;

pub use telegram::TelegramNotifier;
pub use templates::{format_local_time, MessageTemplate};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Ho_Chi_Minh;

/// Alert types that trigger notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AlertType {
    Volatility {
        avg: f64,
        max: f64,
        min: f64,
        last: f64,
        volatility_pct: f64,
    },
    TradeExecuted {
        symbol: String,
        price: String,
        qty: String,
        side: String,
        cost: f64,
    },
    InterestCharged {
        asset: String,
        principal: f64,
        interest: f64,
        isolated_symbol: String,
    },
    OpenOrder {
        symbol: String,
        price: String,
        orig_qty: String,
        executed_qty: String,
        side: String,
        stop_price: String,
        cost: f64,
    },
}

impl AlertType {
    pub fn title(&self) -> &'static str {
        match self {
            AlertType::Volatility { .. } => "Balance",
            AlertType::TradeExecuted { .. } => "Exec Trade",
            AlertType::InterestCharged { .. } => "Interest",
            AlertType::OpenOrder { .. } => "Open Order",
        }
    }
}

/// Where a message is delivered. Alerts go to the broadcast channel, order
/// reports to the private chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    Channel,
    Chat,
}

/// A notification alert to be dispatched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: AlertType,
    pub destination: Destination,
    /// Event time shown at the bottom of the message.
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(alert_type: AlertType, destination: Destination) -> Self {
        Self {
            alert_type,
            destination,
            timestamp: Utc::now(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Use an exchange millisecond timestamp as the event time. Out-of-range
    /// values keep the current time.
    pub fn at_millis(self, millis: i64) -> Self {
        match DateTime::from_timestamp_millis(millis) {
            Some(timestamp) => self.at(timestamp),
            None => self,
        }
    }
}

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, destination: Destination, text: &str) -> Result<(), NotificationError>;
    fn name(&self) -> &str;
}

/// Errors from the notification system.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Telegram transport error: {0}")]
    Telegram(String),
    #[error("Telegram rejected message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },
}

/// Configuration for the notification service.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub telegram_api_url: String,
    pub bot_token: String,
    pub channel_id: String,
    pub chat_id: String,
    pub timezone: Tz,
}

/// The main notification service: renders alerts and dispatches them to all
/// configured channels.
#[derive(Clone)]
pub struct NotificationService {
    channels: std::sync::Arc<Vec<Box<dyn NotificationChannel>>>,
    timezone: Tz,
}

impl NotificationService {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let notifier = TelegramNotifier::new(config)?;
        tracing::info!(
            "Telegram notifications enabled ({})",
            config.telegram_api_url
        );

        Ok(Self::with_channels(vec![Box::new(notifier)], config.timezone))
    }

    pub fn with_channels(channels: Vec<Box<dyn NotificationChannel>>, timezone: Tz) -> Self {
        if channels.is_empty() {
            tracing::info!("No notification channels configured");
        }

        Self {
            channels: std::sync::Arc::new(channels),
            timezone,
        }
    }

    pub fn render(&self, alert: &Alert) -> String {
        MessageTemplate::render(alert, &self.timezone)
    }

    /// Send alert to all channels, awaiting completion. Returns whether at
    /// least one channel accepted it; failures are logged, never raised.
    pub async fn send_alert_async(&self, alert: &Alert) -> bool {
        let text = self.render(alert);
        let mut delivered = false;

        for channel in self.channels.iter() {
            match channel.send(alert.destination, &text).await {
                Ok(()) => {
                    tracing::debug!(
                        "Sent {} notification via {}",
                        alert.alert_type.title(),
                        channel.name()
                    );
                    delivered = true;
                }
                Err(e) => {
                    tracing::warn!("Failed to send notification via {}: {}", channel.name(), e)
                }
            }
        }

        delivered
    }
}
