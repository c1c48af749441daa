use async_trait::async_trait;
use margin_core::{InterestHistory, MarginTrade, OpenOrder, OrderBookTop, RawIsolatedAccount};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures talking to the account data source. Never retried at this layer.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected payload: {0}")]
    Decode(String),

    #[error("Empty order book for {0}")]
    EmptyBook(String),

    #[error("Signing error: {0}")]
    Signing(String),
}

// ---------------------------------------------------------------------------
// Data source trait
// ---------------------------------------------------------------------------

/// Read access to an isolated margin account and the markets it trades.
///
/// `symbol` is an exchange symbol such as `TOMOUSDT` (no separator).
#[async_trait]
pub trait AccountDataSource: Send + Sync {
    /// Best bid and ask for a market
    async fn order_book_top(&self, symbol: &str) -> Result<OrderBookTop, SourceError>;

    /// Isolated margin account state, numerics as delivered
    async fn isolated_account(&self) -> Result<RawIsolatedAccount, SourceError>;

    /// Open isolated-margin orders for a symbol
    async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, SourceError>;

    /// Executed isolated-margin trades for a symbol
    async fn trades(&self, symbol: &str) -> Result<Vec<MarginTrade>, SourceError>;

    /// Interest charges for an isolated symbol
    async fn interest_history(&self, isolated_symbol: &str)
        -> Result<InterestHistory, SourceError>;

    /// Source name for logging
    fn source_name(&self) -> &str;
}

/// Turn a display pair (`btc/usdt`, `TOMO-USDT`) into an exchange symbol (`BTCUSDT`).
pub fn exchange_symbol(pair: &str) -> String {
    pair.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

/// Mask a credential for logs and diagnostics: first and last four
/// characters kept, `****` for anything of eight characters or fewer.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
