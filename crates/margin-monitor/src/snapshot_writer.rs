use std::sync::Arc;

use account_source::AccountDataSource;
use chrono::{DateTime, Utc};
use margin_core::{minute_timestamp, normalize_account};
use snapshot_store::{merge_record, TimeSeriesStore};

use crate::MonitorError;

/// One sampling tick: normalize the account, value it in the quote currency,
/// store it under the minute timestamp and merge the open orders.
pub struct SnapshotWriter {
    source: Arc<dyn AccountDataSource>,
    store: Arc<dyn TimeSeriesStore>,
    trading_pair: String,
    reference_pair: String,
}

impl SnapshotWriter {
    pub fn new(
        source: Arc<dyn AccountDataSource>,
        store: Arc<dyn TimeSeriesStore>,
        trading_pair: impl Into<String>,
        reference_pair: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            trading_pair: trading_pair.into(),
            reference_pair: reference_pair.into(),
        }
    }

    /// Run a tick and return the snapshot timestamp.
    ///
    /// The snapshot write and the order merges are independent: a failure
    /// after the snapshot is stored leaves it in place.
    pub async fn write_tick(&self, now: DateTime<Utc>) -> Result<i64, MonitorError> {
        let timestamp = minute_timestamp(now);

        let raw = self.source.isolated_account().await?;
        let account = normalize_account(&raw)?;

        let book = self.source.order_book_top(&self.reference_pair).await?;
        let snapshot = account.into_snapshot(timestamp, book.bid.price());
        self.store.put_snapshot(&snapshot).await?;

        let orders = self.source.open_orders(&self.trading_pair).await?;
        for order in &orders {
            merge_record(self.store.as_ref(), order).await?;
        }

        tracing::info!(
            "Snapshot {} stored from {}: {:.2} net USDT, {} active assets, {} open orders",
            timestamp,
            self.source.source_name(),
            snapshot.total_net_asset_of_usdt,
            snapshot.assets.len(),
            orders.len()
        );

        Ok(timestamp)
    }
}
