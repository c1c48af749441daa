use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use margin_core::minute_timestamp;
use margin_monitor::OrderReport;
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct VolatilityQuery {
    pub force: Option<String>,
}

/// Statistics returned by the volatility check, whether or not it alerted.
#[derive(Debug, Serialize)]
pub struct VolatilitySummary {
    pub sum: f64,
    pub avg: f64,
    pub last: f64,
    pub volatility: f64,
}

/// Token-gated monitoring routes. The short aliases match the older paths
/// schedulers still call.
pub fn margin_routes() -> Router<AppState> {
    Router::new()
        .route("/getMarginIsolatedAccount", get(snapshot_tick))
        .route("/getAbnormalVolatility", get(abnormal_volatility))
        .route("/getOrder", get(report_orders))
        .route("/order", get(report_orders))
        .route("/getMarginMytrades", get(ingest_trades))
        .route("/myTrades", get(ingest_trades))
        .route("/getInterest", get(ingest_interest))
}

/// Sample the account and store a snapshot for the current minute.
async fn snapshot_tick(State(state): State<AppState>) -> Result<Json<ApiResponse<i64>>, AppError> {
    let timestamp = state.snapshots.write_tick(Utc::now()).await?;
    Ok(Json(ApiResponse::success(timestamp)))
}

async fn abnormal_volatility(
    State(state): State<AppState>,
    Query(query): Query<VolatilityQuery>,
) -> Result<Json<VolatilitySummary>, AppError> {
    let force = query.force.as_deref() == Some("true");
    let outcome = state.volatility.check(Utc::now(), force).await?;

    Ok(Json(VolatilitySummary {
        sum: outcome.stats.sum,
        avg: outcome.stats.avg,
        last: outcome.stats.last,
        volatility: outcome.stats.volatility_pct,
    }))
}

async fn report_orders(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<OrderReport>>, AppError> {
    let report = state.orders.report().await?;
    Ok(Json(ApiResponse::success(report)))
}

async fn ingest_trades(State(state): State<AppState>) -> Result<Json<ApiResponse<i64>>, AppError> {
    state.ingestor.ingest_trades().await?;
    Ok(Json(ApiResponse::success(minute_timestamp(Utc::now()))))
}

async fn ingest_interest(State(state): State<AppState>) -> Result<Json<ApiResponse<i64>>, AppError> {
    state.ingestor.ingest_interest().await?;
    Ok(Json(ApiResponse::success(minute_timestamp(Utc::now()))))
}
