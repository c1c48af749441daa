use margin_core::{OrderBookTop, PriceLevel, RawNumber};
use serde::Deserialize;

use account_source::SourceError;

/// `GET /api/v3/depth` response. Levels are `[price, quantity]` text pairs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthResponse {
    #[serde(default)]
    pub last_update_id: Option<u64>,
    pub bids: Vec<(RawNumber, RawNumber)>,
    pub asks: Vec<(RawNumber, RawNumber)>,
}

impl DepthResponse {
    /// Best level on each side.
    pub fn top(&self, symbol: &str) -> Result<OrderBookTop, SourceError> {
        let (bid, ask) = match (self.bids.first(), self.asks.first()) {
            (Some(bid), Some(ask)) => (bid, ask),
            _ => return Err(SourceError::EmptyBook(symbol.to_string())),
        };

        Ok(OrderBookTop {
            bid: level(bid, "bids[0]")?,
            ask: level(ask, "asks[0]")?,
        })
    }
}

fn level((price, qty): &(RawNumber, RawNumber), side: &str) -> Result<PriceLevel, SourceError> {
    let price = price
        .parse(&format!("{side}.price"))
        .map_err(|e| SourceError::Decode(e.to_string()))?;
    let qty = qty
        .parse(&format!("{side}.quantity"))
        .map_err(|e| SourceError::Decode(e.to_string()))?;
    Ok(PriceLevel(price, qty))
}
