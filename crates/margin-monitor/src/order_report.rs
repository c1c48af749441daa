use std::sync::Arc;

use account_source::AccountDataSource;
use margin_core::OpenOrder;
use notification_service::{Alert, AlertType, Destination, NotificationService};
use serde::Serialize;

use crate::MonitorError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderReport {
    pub orders: usize,
    pub delivered: usize,
}

/// Sends one message per open order of the trading pair to the private chat.
pub struct OrderReporter {
    source: Arc<dyn AccountDataSource>,
    notifier: NotificationService,
    trading_pair: String,
}

impl OrderReporter {
    pub fn new(
        source: Arc<dyn AccountDataSource>,
        notifier: NotificationService,
        trading_pair: impl Into<String>,
    ) -> Self {
        Self {
            source,
            notifier,
            trading_pair: trading_pair.into(),
        }
    }

    /// Every order is rendered before anything is sent, so a malformed order
    /// fails the report without a partial delivery. Sends are independent.
    pub async fn report(&self) -> Result<OrderReport, MonitorError> {
        let orders = self.source.open_orders(&self.trading_pair).await?;
        let alerts = orders
            .iter()
            .map(order_alert)
            .collect::<Result<Vec<_>, _>>()?;

        let mut delivered = 0;
        for alert in &alerts {
            if self.notifier.send_alert_async(alert).await {
                delivered += 1;
            }
        }

        tracing::info!(
            "Reported {}/{} open orders for {}",
            delivered,
            alerts.len(),
            self.trading_pair
        );

        Ok(OrderReport {
            orders: alerts.len(),
            delivered,
        })
    }
}

fn order_alert(order: &OpenOrder) -> Result<Alert, MonitorError> {
    let alert_type = AlertType::OpenOrder {
        symbol: order.symbol.clone(),
        price: order.price.to_string(),
        orig_qty: order.orig_qty.to_string(),
        executed_qty: order.executed_qty.to_string(),
        side: order.side.clone(),
        stop_price: order
            .stop_price
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        cost: order.cost()?,
    };

    Ok(Alert::new(alert_type, Destination::Chat).at_millis(order.update_time))
}
