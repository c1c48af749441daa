use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    routing::get,
    Json, Router,
};
use account_source::exchange_symbol;
use margin_core::OrderBookTop;
use serde::Deserialize;

use crate::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub pair: Option<String>,
}

/// Best bid/ask lookup, gated by the legacy token envelope.
pub fn quote_routes() -> Router<AppState> {
    Router::new().route("/fetchMarkets", get(fetch_markets))
}

/// Client diagnostics, answered only for requests addressed to localhost.
pub fn debug_routes() -> Router<AppState> {
    Router::new().route("/exchange", get(exchange_info))
}

async fn fetch_markets(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<OrderBookTop>, AppError> {
    let pair = query
        .pair
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("pair is required".to_string()))?;

    let symbol = exchange_symbol(&pair);
    let top = state.source.order_book_top(&symbol).await?;
    Ok(Json(top))
}

pub(crate) fn is_local_host(headers: &HeaderMap) -> bool {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|host| host.contains("localhost"))
}

async fn exchange_info(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    if !is_local_host(&headers) {
        return Json(serde_json::json!({}));
    }

    Json(serde_json::to_value(state.exchange.as_ref()).unwrap_or_default())
}
