use std::sync::Arc;

use margin_core::{Collection, DataError, InterestCharge, MarginTrade, RecordChange};
use notification_service::{Alert, AlertType, Destination, NotificationService};
use serde::de::DeserializeOwned;
use snapshot_store::TimeSeriesStore;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::MonitorError;

const DRAIN_BATCH: u32 = 100;

/// Announces each trade and interest charge the first time it carries its
/// identifier.
///
/// The store queues first-seen writes durably; this notifier drains that
/// queue on start and whenever the change feed signals (or lags). A change is
/// acknowledged only after it was handled, so a crash in between repeats the
/// announcement instead of losing it.
#[derive(Clone)]
pub struct ChangeEventNotifier {
    store: Arc<dyn TimeSeriesStore>,
    notifier: NotificationService,
}

impl ChangeEventNotifier {
    pub fn new(store: Arc<dyn TimeSeriesStore>, notifier: NotificationService) -> Self {
        Self { store, notifier }
    }

    /// Subscribe to the store and announce changes on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        let feed = self.store.subscribe();
        tokio::spawn(self.run(feed))
    }

    /// Drain the backlog, then drain again on every feed signal until the
    /// feed closes.
    pub async fn run(self, mut feed: broadcast::Receiver<RecordChange>) {
        self.drain_logged().await;

        loop {
            match feed.recv().await {
                Ok(_) => self.drain_logged().await,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Change feed lagged by {} events, draining queue", skipped);
                    self.drain_logged().await;
                }
                Err(RecvError::Closed) => {
                    tracing::info!("Change feed closed, notifier stopping");
                    break;
                }
            }
        }
    }

    async fn drain_logged(&self) {
        if let Err(e) = self.drain().await {
            tracing::error!("Draining pending changes failed: {}", e);
        }
    }

    /// Handle and acknowledge every queued change. Returns how many alerts
    /// were dispatched. A record that cannot be decoded is logged and
    /// acknowledged; a store failure stops the drain and leaves the rest
    /// queued.
    pub async fn drain(&self) -> Result<usize, MonitorError> {
        let mut dispatched = 0;

        loop {
            let batch = self.store.pending_changes(DRAIN_BATCH).await?;
            if batch.is_empty() {
                return Ok(dispatched);
            }

            for pending in batch {
                let change = &pending.change;
                match self.handle(change).await {
                    Ok(true) => dispatched += 1,
                    Ok(false) => {}
                    Err(e) => tracing::error!(
                        "Change notification for {}/{} failed: {}",
                        change.collection,
                        change.record_id,
                        e
                    ),
                }
                self.store.acknowledge(pending.seq).await?;
            }
        }
    }

    /// Notify for one change. Returns whether an alert was dispatched.
    pub async fn handle(&self, change: &RecordChange) -> Result<bool, MonitorError> {
        if !change.is_first_seen() {
            return Ok(false);
        }

        let Some(after) = &change.after else {
            return Ok(false);
        };

        let alert = match change.collection {
            Collection::Trade => trade_alert(&decode::<MarginTrade>(change.collection, after)?)?,
            Collection::Interest => {
                interest_alert(&decode::<InterestCharge>(change.collection, after)?)?
            }
            Collection::Order => return Ok(false),
        };

        tracing::debug!("First sighting of {}/{}", change.collection, change.record_id);
        self.notifier.send_alert_async(&alert).await;
        Ok(true)
    }
}

fn decode<T: DeserializeOwned>(
    collection: Collection,
    document: &serde_json::Value,
) -> Result<T, DataError> {
    serde_json::from_value(document.clone()).map_err(|e| DataError::MalformedRecord {
        collection: collection.to_string(),
        reason: e.to_string(),
    })
}

fn trade_alert(trade: &MarginTrade) -> Result<Alert, DataError> {
    let alert_type = AlertType::TradeExecuted {
        symbol: trade.symbol.clone(),
        price: trade.price.to_string(),
        qty: trade.qty.to_string(),
        side: trade.side_label().to_string(),
        cost: trade.cost()?,
    };

    Ok(Alert::new(alert_type, Destination::Channel).at_millis(trade.time))
}

fn interest_alert(charge: &InterestCharge) -> Result<Alert, DataError> {
    let alert_type = AlertType::InterestCharged {
        asset: charge.asset.clone(),
        principal: charge.principal.parse("principal")?,
        interest: charge.interest.parse("interest")?,
        isolated_symbol: charge.isolated_symbol.clone().unwrap_or_default(),
    };

    Ok(Alert::new(alert_type, Destination::Channel).at_millis(charge.interest_accured_time))
}
