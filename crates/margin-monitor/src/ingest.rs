use std::sync::Arc;

use account_source::AccountDataSource;
use snapshot_store::{merge_record, TimeSeriesStore};

use crate::MonitorError;

/// Pulls trade and interest history and merges every record by its natural id.
/// New records are queued by the store for first-seen notifications.
pub struct RecordIngestor {
    source: Arc<dyn AccountDataSource>,
    store: Arc<dyn TimeSeriesStore>,
    trading_pair: String,
}

impl RecordIngestor {
    pub fn new(
        source: Arc<dyn AccountDataSource>,
        store: Arc<dyn TimeSeriesStore>,
        trading_pair: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            trading_pair: trading_pair.into(),
        }
    }

    /// Merge executed trades; returns how many were written.
    pub async fn ingest_trades(&self) -> Result<usize, MonitorError> {
        let trades = self.source.trades(&self.trading_pair).await?;
        for trade in &trades {
            merge_record(self.store.as_ref(), trade).await?;
        }

        tracing::info!("Ingested {} trades for {}", trades.len(), self.trading_pair);
        Ok(trades.len())
    }

    /// Merge interest charges; returns how many were written.
    pub async fn ingest_interest(&self) -> Result<usize, MonitorError> {
        let history = self.source.interest_history(&self.trading_pair).await?;
        for charge in &history.rows {
            merge_record(self.store.as_ref(), charge).await?;
        }

        tracing::info!(
            "Ingested {} interest charges for {}",
            history.rows.len(),
            self.trading_pair
        );
        Ok(history.rows.len())
    }
}
