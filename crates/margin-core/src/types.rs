use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::DataError;

// ---------------------------------------------------------------------------
// Numeric fields as delivered by the exchange (text or number)
// ---------------------------------------------------------------------------

/// A numeric value that the exchange may encode either as a JSON number or as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    /// Parse into a finite float. `field` names the value in the error.
    pub fn parse(&self, field: &str) -> Result<f64, DataError> {
        let value = match self {
            RawNumber::Number(n) => *n,
            RawNumber::Text(s) => s.trim().parse::<f64>().map_err(|_| DataError::InvalidNumber {
                field: field.to_string(),
                value: s.clone(),
            })?,
        };

        if !value.is_finite() {
            return Err(DataError::InvalidNumber {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
        Ok(value)
    }
}

impl std::fmt::Display for RawNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawNumber::Number(n) => write!(f, "{}", n),
            RawNumber::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for RawNumber {
    fn from(value: f64) -> Self {
        RawNumber::Number(value)
    }
}

impl From<&str> for RawNumber {
    fn from(value: &str) -> Self {
        RawNumber::Text(value.to_string())
    }
}

/// Parse a field that must be present.
pub(crate) fn require(field: &str, value: Option<&RawNumber>) -> Result<f64, DataError> {
    value
        .ok_or_else(|| DataError::MissingField {
            field: field.to_string(),
        })?
        .parse(field)
}

// ---------------------------------------------------------------------------
// Raw isolated margin account payload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAssetBalance {
    #[serde(default)]
    pub asset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borrow_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repay_enabled: Option<bool>,
    pub net_asset: Option<RawNumber>,
    pub total_asset: Option<RawNumber>,
    pub interest: Option<RawNumber>,
    pub net_asset_of_btc: Option<RawNumber>,
    pub free: Option<RawNumber>,
    pub locked: Option<RawNumber>,
    pub borrowed: Option<RawNumber>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIsolatedAsset {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub base_asset: RawAssetBalance,
    #[serde(default)]
    pub quote_asset: RawAssetBalance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolated_created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_level_status: Option<String>,
    pub index_price: Option<RawNumber>,
    pub margin_ratio: Option<RawNumber>,
    pub liquidate_rate: Option<RawNumber>,
    pub liquidate_price: Option<RawNumber>,
    pub margin_level: Option<RawNumber>,
}

/// Isolated margin account state exactly as the data source returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIsolatedAccount {
    pub total_asset_of_btc: Option<RawNumber>,
    pub total_liability_of_btc: Option<RawNumber>,
    pub total_net_asset_of_btc: Option<RawNumber>,
    #[serde(default)]
    pub assets: Vec<RawIsolatedAsset>,
}

// ---------------------------------------------------------------------------
// Normalized account state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetBalance {
    pub asset: String,
    pub net_asset: f64,
    pub total_asset: f64,
    pub interest: f64,
    pub net_asset_of_btc: f64,
    pub free: f64,
    pub locked: f64,
    pub borrowed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsolatedAssetSnapshot {
    pub symbol: String,
    pub base_asset: AssetBalance,
    pub quote_asset: AssetBalance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin_level_status: Option<String>,
    pub index_price: f64,
    pub margin_ratio: f64,
    pub liquidate_rate: f64,
    pub liquidate_price: f64,
    pub margin_level: f64,
}

/// Account state after numeric normalization, not yet stamped or valued in USDT.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAccount {
    pub total_asset_of_btc: f64,
    pub total_liability_of_btc: f64,
    pub total_net_asset_of_btc: f64,
    pub assets: Vec<IsolatedAssetSnapshot>,
}

impl NormalizedAccount {
    /// Stamp with the tick timestamp and value the net BTC position at the reference bid.
    pub fn into_snapshot(self, timestamp: i64, reference_bid: f64) -> Snapshot {
        Snapshot {
            timestamp,
            total_asset_of_btc: self.total_asset_of_btc,
            total_liability_of_btc: self.total_liability_of_btc,
            total_net_asset_of_btc: self.total_net_asset_of_btc,
            total_net_asset_of_usdt: self.total_net_asset_of_btc * reference_bid,
            assets: self.assets,
        }
    }
}

/// One stored sampling tick. Keyed by `timestamp` (seconds, minute aligned).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: i64,
    pub total_asset_of_btc: f64,
    pub total_liability_of_btc: f64,
    pub total_net_asset_of_btc: f64,
    pub total_net_asset_of_usdt: f64,
    pub assets: Vec<IsolatedAssetSnapshot>,
}

// ---------------------------------------------------------------------------
// Order book
// ---------------------------------------------------------------------------

/// `[price, quantity]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel(pub f64, pub f64);

impl PriceLevel {
    pub fn price(&self) -> f64 {
        self.0
    }

    pub fn quantity(&self) -> f64 {
        self.1
    }
}

/// Best bid and ask of a market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBookTop {
    pub bid: PriceLevel,
    pub ask: PriceLevel,
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// Document collections holding raw exchange records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Order,
    Trade,
    Interest,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Order => "order",
            Collection::Trade => "trade",
            Collection::Interest => "interest",
        }
    }

    /// Field carrying the natural identifier inside a stored document.
    pub fn id_field(&self) -> &'static str {
        match self {
            Collection::Order => "orderId",
            Collection::Trade => "id",
            Collection::Interest => "txId",
        }
    }

    /// Collections whose new records are announced when first seen.
    pub fn announces_first_seen(&self) -> bool {
        matches!(self, Collection::Trade | Collection::Interest)
    }
}

impl std::str::FromStr for Collection {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(Collection::Order),
            "trade" => Ok(Collection::Trade),
            "interest" => Ok(Collection::Interest),
            other => Err(DataError::MalformedRecord {
                collection: other.to_string(),
                reason: "unknown collection".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw exchange record persisted by its natural identifier.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn record_id(&self) -> String;
}

/// An open isolated-margin order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrder {
    pub order_id: u64,
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    pub price: RawNumber,
    pub orig_qty: RawNumber,
    pub executed_qty: RawNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cummulative_quote_qty: Option<RawNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
    pub side: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<RawNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iceberg_qty: Option<RawNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    pub update_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_working: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_isolated: Option<bool>,
}

impl OpenOrder {
    /// Notional value of the original quantity at the limit price.
    pub fn cost(&self) -> Result<f64, DataError> {
        Ok(self.orig_qty.parse("origQty")? * self.price.parse("price")?)
    }
}

impl Record for OpenOrder {
    const COLLECTION: Collection = Collection::Order;

    fn record_id(&self) -> String {
        self.order_id.to_string()
    }
}

/// An executed isolated-margin trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginTrade {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<u64>,
    pub symbol: String,
    pub price: RawNumber,
    pub qty: RawNumber,
    pub commission: RawNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission_asset: Option<String>,
    pub is_buyer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_maker: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_best_match: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_isolated: Option<bool>,
    pub time: i64,
}

impl MarginTrade {
    pub fn side_label(&self) -> &'static str {
        if self.is_buyer {
            "Buy"
        } else {
            "Sell"
        }
    }

    /// `price * qty + commission`
    pub fn cost(&self) -> Result<f64, DataError> {
        let price = self.price.parse("price")?;
        let qty = self.qty.parse("qty")?;
        let commission = self.commission.parse("commission")?;
        Ok(price * qty + commission)
    }
}

impl Record for MarginTrade {
    const COLLECTION: Collection = Collection::Trade;

    fn record_id(&self) -> String {
        self.id.to_string()
    }
}

/// An interest charge on a borrowed isolated-margin asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestCharge {
    pub tx_id: u64,
    /// Exchange spelling.
    pub interest_accured_time: i64,
    pub asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_asset: Option<String>,
    pub principal: RawNumber,
    pub interest: RawNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<RawNumber>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isolated_symbol: Option<String>,
}

impl Record for InterestCharge {
    const COLLECTION: Collection = Collection::Interest;

    fn record_id(&self) -> String {
        self.tx_id.to_string()
    }
}

/// Paged interest history response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterestHistory {
    #[serde(default)]
    pub rows: Vec<InterestCharge>,
    #[serde(default)]
    pub total: Option<u64>,
}
