//! In-crate fakes for the data source and the notification channel.

use account_source::{AccountDataSource, SourceError};
use async_trait::async_trait;
use margin_core::{
    InterestCharge, InterestHistory, MarginTrade, OpenOrder, OrderBookTop, PriceLevel,
    RawIsolatedAccount, RawNumber,
};
use notification_service::{
    Destination, NotificationChannel, NotificationError, NotificationService,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct FakeSource {
    pub account: serde_json::Value,
    pub reference_bid: f64,
    pub orders: Vec<OpenOrder>,
    pub trades: Vec<MarginTrade>,
    pub interest: Vec<InterestCharge>,
    pub unavailable: bool,
    pub calls: AtomicUsize,
}

impl Default for FakeSource {
    fn default() -> Self {
        Self {
            account: account_json("0.5", "100", "0"),
            reference_bid: 30000.0,
            orders: vec![],
            trades: vec![],
            interest: vec![],
            unavailable: false,
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeSource {
    fn call(&self) -> Result<(), SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(SourceError::Transport("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountDataSource for FakeSource {
    async fn order_book_top(&self, _symbol: &str) -> Result<OrderBookTop, SourceError> {
        self.call()?;
        Ok(OrderBookTop {
            bid: PriceLevel(self.reference_bid, 1.0),
            ask: PriceLevel(self.reference_bid + 0.1, 1.0),
        })
    }

    async fn isolated_account(&self) -> Result<RawIsolatedAccount, SourceError> {
        self.call()?;
        serde_json::from_value(self.account.clone()).map_err(|e| SourceError::Decode(e.to_string()))
    }

    async fn open_orders(&self, _symbol: &str) -> Result<Vec<OpenOrder>, SourceError> {
        self.call()?;
        Ok(self.orders.clone())
    }

    async fn trades(&self, _symbol: &str) -> Result<Vec<MarginTrade>, SourceError> {
        self.call()?;
        Ok(self.trades.clone())
    }

    async fn interest_history(
        &self,
        _isolated_symbol: &str,
    ) -> Result<InterestHistory, SourceError> {
        self.call()?;
        Ok(InterestHistory {
            total: Some(self.interest.len() as u64),
            rows: self.interest.clone(),
        })
    }

    fn source_name(&self) -> &str {
        "fake"
    }
}

pub type Sent = Arc<Mutex<Vec<(Destination, String)>>>;

pub struct RecordingChannel {
    pub sent: Sent,
    pub fail: bool,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, destination: Destination, text: &str) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::Telegram("unreachable".into()));
        }
        self.sent.lock().unwrap().push((destination, text.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn recording_service() -> (NotificationService, Sent) {
    let sent: Sent = Arc::default();
    let channel = RecordingChannel {
        sent: sent.clone(),
        fail: false,
    };
    let service = NotificationService::with_channels(
        vec![Box::new(channel)],
        notification_service::DEFAULT_TIMEZONE,
    );
    (service, sent)
}

pub fn failing_service() -> NotificationService {
    let channel = RecordingChannel {
        sent: Arc::default(),
        fail: true,
    };
    NotificationService::with_channels(vec![Box::new(channel)], notification_service::DEFAULT_TIMEZONE)
}

/// Isolated account with one TOMOUSDT pair.
pub fn account_json(total_net_btc: &str, base_net: &str, quote_net: &str) -> serde_json::Value {
    let balance = |asset: &str, net: &str| {
        json!({
            "asset": asset,
            "borrowEnabled": true,
            "borrowed": "0",
            "free": net,
            "interest": "0",
            "locked": "0",
            "netAsset": net,
            "netAssetOfBtc": "0.0001",
            "repayEnabled": true,
            "totalAsset": net
        })
    };

    json!({
        "assets": [{
            "baseAsset": balance("TOMO", base_net),
            "quoteAsset": balance("USDT", quote_net),
            "symbol": "TOMOUSDT",
            "isolatedCreated": true,
            "enabled": true,
            "marginLevel": "999",
            "marginLevelStatus": "EXCESSIVE",
            "marginRatio": "5",
            "indexPrice": "1.2",
            "liquidatePrice": "0",
            "liquidateRate": "0",
            "tradeEnabled": true
        }],
        "totalAssetOfBtc": total_net_btc,
        "totalLiabilityOfBtc": "0",
        "totalNetAssetOfBtc": total_net_btc
    })
}

pub fn open_order(order_id: u64, price: &str, orig_qty: &str) -> OpenOrder {
    serde_json::from_value(json!({
        "orderId": order_id,
        "symbol": "TOMOUSDT",
        "price": price,
        "origQty": orig_qty,
        "executedQty": "0",
        "side": "SELL",
        "stopPrice": "0.00000000",
        "updateTime": 1_672_531_200_000_i64
    }))
    .unwrap()
}

pub fn trade(id: u64) -> MarginTrade {
    MarginTrade {
        id,
        order_id: Some(id + 1000),
        symbol: "TOMOUSDT".into(),
        price: RawNumber::from("1.5"),
        qty: RawNumber::from("100"),
        commission: RawNumber::from("0.15"),
        commission_asset: Some("USDT".into()),
        is_buyer: false,
        is_maker: Some(true),
        is_best_match: Some(true),
        is_isolated: Some(true),
        time: 1_672_531_200_000,
    }
}

pub fn interest(tx_id: u64) -> InterestCharge {
    serde_json::from_value(json!({
        "txId": tx_id,
        "interestAccuredTime": 1_672_531_200_000_i64,
        "asset": "USDT",
        "principal": "45.3313",
        "interest": "0.00024995",
        "type": "ON_BORROW",
        "isolatedSymbol": "TOMOUSDT"
    }))
    .unwrap()
}
