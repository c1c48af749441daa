use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    routing::any,
    Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::market_routes::is_local_host;
use crate::AppState;

#[derive(Debug, Deserialize)]
struct RelayUpdate {
    message: Option<RelayMessage>,
}

#[derive(Debug, Deserialize)]
struct RelayMessage {
    text: Option<String>,
}

/// Report a chat command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RelayCommand {
    OrderReport,
    VolatilityReport,
}

impl RelayCommand {
    /// `o`/`O` asks for the open-order report, anything else for a forced
    /// volatility report.
    pub(crate) fn from_text(text: &str) -> Self {
        match text {
            "o" | "O" => RelayCommand::OrderReport,
            _ => RelayCommand::VolatilityReport,
        }
    }
}

pub fn relay_routes() -> Router<AppState> {
    Router::new().route("/telehook", any(telehook))
}

/// Chat relay webhook. Always answers 200; the report's outcome is only
/// logged. Requests addressed to localhost are not relayed.
///
/// Commands run against the server's own services; request headers never
/// pick a destination.
async fn telehook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if method != Method::POST {
        return StatusCode::OK;
    }

    let text = serde_json::from_slice::<RelayUpdate>(&body)
        .ok()
        .and_then(|update| update.message)
        .and_then(|message| message.text);
    let Some(text) = text else {
        return StatusCode::OK;
    };

    if is_local_host(&headers) {
        tracing::debug!("Relay from localhost ignored");
        return StatusCode::OK;
    }

    let command = RelayCommand::from_text(&text);
    tracing::info!("Relaying chat command as {:?}", command);

    match command {
        RelayCommand::OrderReport => match state.orders.report().await {
            Ok(report) => tracing::debug!(
                "Relayed order report: {} orders, {} delivered",
                report.orders,
                report.delivered
            ),
            Err(e) => tracing::warn!("Relayed order report failed: {}", e),
        },
        RelayCommand::VolatilityReport => match state.volatility.check(Utc::now(), true).await {
            Ok(outcome) => tracing::debug!(
                "Relayed volatility report: {:.2}%, delivered {}",
                outcome.stats.volatility_pct,
                outcome.delivered
            ),
            Err(e) => tracing::warn!("Relayed volatility report failed: {}", e),
        },
    }

    StatusCode::OK
}
