use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::{Alert, AlertType};

/// Render a timestamp in `tz` as `HH:MM:SS D/M/YYYY`.
pub fn format_local_time(timestamp: DateTime<Utc>, tz: &Tz) -> String {
    timestamp
        .with_timezone(tz)
        .format("%H:%M:%S %-d/%-m/%Y")
        .to_string()
}

/// Telegram Markdown bodies for each alert type.
pub struct MessageTemplate;

impl MessageTemplate {
    pub fn render(alert: &Alert, tz: &Tz) -> String {
        let title = alert.alert_type.title();
        let body = match &alert.alert_type {
            AlertType::Volatility {
                avg,
                max,
                min,
                last,
                volatility_pct,
            } => format!(
                "Avg          : ${avg}\n\
                 Max          : *${max}*\n\
                 Min          : ${min}\n\
                 Last         : *${last}*\n\
                 Volatility : *{volatility_pct}%*"
            ),
            AlertType::TradeExecuted {
                symbol,
                price,
                qty,
                side,
                cost,
            } => format!(
                "*{symbol}*\n\
                 price: {price}\n\
                 qty: {qty}\n\
                 side: *{side}*\n\
                 cost: *{cost:.2}*"
            ),
            AlertType::InterestCharged {
                asset,
                principal,
                interest,
                isolated_symbol,
            } => format!(
                "*{asset}*\n\
                 principal: {principal:.2}\n\
                 interest: *{interest:.4}*\n\
                 isolatedSymbol: *{isolated_symbol}*"
            ),
            AlertType::OpenOrder {
                symbol,
                price,
                orig_qty,
                executed_qty,
                side,
                stop_price,
                cost,
            } => format!(
                "*{symbol}*\n\
                 price: {price}\n\
                 origQty: {orig_qty}\n\
                 executedQty: {executed_qty}\n\
                 side: *{side}*\n\
                 stopPrice: {stop_price}\n\
                 cost: *{cost:.2}*"
            ),
        };

        format!(
            "*{title}*\n{body}\n{}",
            format_local_time(alert.timestamp, tz)
        )
    }
}
