use std::sync::Arc;

use chrono::{DateTime, Utc};
use margin_core::{
    compute_volatility, minute_timestamp, should_dispatch, window_start, VolatilityStats,
};
use notification_service::{Alert, AlertType, Destination, NotificationService};
use snapshot_store::TimeSeriesStore;

use crate::MonitorError;

/// Result of one volatility check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityOutcome {
    pub stats: VolatilityStats,
    /// An alert was rendered and handed to the notification service.
    pub dispatched: bool,
    /// At least one channel accepted the alert.
    pub delivered: bool,
}

/// Windowed statistics over stored snapshots plus the alert dispatcher.
pub struct VolatilityMonitor {
    store: Arc<dyn TimeSeriesStore>,
    notifier: NotificationService,
}

impl VolatilityMonitor {
    pub fn new(store: Arc<dyn TimeSeriesStore>, notifier: NotificationService) -> Self {
        Self { store, notifier }
    }

    /// Statistics for the window ending at the minute of `now`.
    pub async fn window_stats(&self, now: DateTime<Utc>) -> Result<VolatilityStats, MonitorError> {
        let from = window_start(minute_timestamp(now));
        let snapshots = self.store.snapshots_since(from).await?;
        let values: Vec<f64> = snapshots
            .iter()
            .map(|s| s.total_net_asset_of_usdt)
            .collect();

        Ok(compute_volatility(&values)?)
    }

    /// Compute the window statistics and alert when the latest balance left
    /// the band, or unconditionally when `force` is set. The statistics are
    /// returned whether or not the alert was delivered.
    pub async fn check(
        &self,
        now: DateTime<Utc>,
        force: bool,
    ) -> Result<VolatilityOutcome, MonitorError> {
        let stats = self.window_stats(now).await?;

        if !should_dispatch(&stats, force) {
            tracing::info!("Volatility {}% within band", stats.volatility_pct);
            return Ok(VolatilityOutcome {
                stats,
                dispatched: false,
                delivered: false,
            });
        }

        tracing::info!(
            "Dispatching volatility alert: {}% (force={})",
            stats.volatility_pct,
            force
        );

        let alert = Alert::new(
            AlertType::Volatility {
                avg: stats.avg,
                max: stats.max,
                min: stats.min,
                last: stats.last,
                volatility_pct: stats.volatility_pct,
            },
            Destination::Channel,
        )
        .at(now);
        let delivered = self.notifier.send_alert_async(&alert).await;

        Ok(VolatilityOutcome {
            stats,
            dispatched: true,
            delivered,
        })
    }
}
