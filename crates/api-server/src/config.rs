use account_source::{exchange_symbol, mask_api_key};
use binance_client::DEFAULT_BASE_URL;
use chrono_tz::Tz;
use notification_service::{NotificationConfig, DEFAULT_TELEGRAM_API_URL, DEFAULT_TIMEZONE};
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration, read once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub binance_api_key: String,
    pub binance_api_secret: String,
    pub binance_base_url: String,
    pub http_token: String,
    pub notification: NotificationConfig,
    /// Exchange symbol of the traded isolated pair, e.g. `TOMOUSDT`.
    pub trading_pair: String,
    /// Market whose best bid values the account, e.g. `BTCUSDT`.
    pub reference_pair: String,
    pub database_url: String,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Load from environment variables (after `.env`, if any, was applied).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));
        let or_default = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        let binance_api_key = required("BINANCE_API_KEY")?;
        let binance_api_secret = required("BINANCE_API_SECRET")?;
        let http_token = required("HTTP_TOKEN")?;
        let bot_token = required("TELEGRAM_BOT_TOKEN")?;
        let channel_id = required("TELEGRAM_CHANNEL_ID")?;
        let chat_id = required("TELEGRAM_CHAT_ID")?;

        let timezone = match get("REPORT_TIMEZONE") {
            Some(name) => name.parse::<Tz>().map_err(|e| ConfigError::Invalid {
                name: "REPORT_TIMEZONE",
                reason: e.to_string(),
            })?,
            None => DEFAULT_TIMEZONE,
        };

        let bind_addr = or_default("BIND_ADDR", "0.0.0.0:8080")
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        Ok(Self {
            binance_api_key,
            binance_api_secret,
            binance_base_url: or_default("BINANCE_BASE_URL", DEFAULT_BASE_URL),
            http_token,
            notification: NotificationConfig {
                telegram_api_url: or_default("TELEGRAM_API_URL", DEFAULT_TELEGRAM_API_URL),
                bot_token,
                channel_id,
                chat_id,
                timezone,
            },
            trading_pair: exchange_symbol(&or_default("TRADING_PAIR", "TOMOUSDT")),
            reference_pair: exchange_symbol(&or_default("REFERENCE_PAIR", "BTCUSDT")),
            database_url: or_default("DATABASE_URL", "sqlite:margin.db"),
            bind_addr,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("binance_api_key", &mask_api_key(&self.binance_api_key))
            .field("binance_base_url", &self.binance_base_url)
            .field("http_token", &mask_api_key(&self.http_token))
            .field("telegram_api_url", &self.notification.telegram_api_url)
            .field("telegram_channel_id", &self.notification.channel_id)
            .field("telegram_chat_id", &self.notification.chat_id)
            .field("timezone", &self.notification.timezone)
            .field("trading_pair", &self.trading_pair)
            .field("reference_pair", &self.reference_pair)
            .field("database_url", &self.database_url)
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}
