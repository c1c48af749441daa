pub mod auth;
pub mod config;
mod margin_routes;
mod market_routes;
mod relay_routes;

pub use config::{AppConfig, ConfigError};

use std::sync::Arc;

use account_source::{AccountDataSource, SourceError};
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use binance_client::BinanceClient;
use margin_monitor::{
    ChangeEventNotifier, MonitorError, OrderReporter, RecordIngestor, SnapshotWriter,
    VolatilityMonitor,
};
use notification_service::NotificationService;
use serde::Serialize;
use snapshot_store::{SqliteStore, TimeSeriesStore};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};


/// Public view of the exchange client, served by the local debug endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInfo {
    pub source: String,
    pub base_url: String,
    pub api_key: String,
    pub trading_pair: String,
}

/// Shared handles for every request. Components are stateless between calls.
#[derive(Clone)]
pub struct AppState {
    pub token_hash: Arc<String>,
    pub source: Arc<dyn AccountDataSource>,
    pub snapshots: Arc<SnapshotWriter>,
    pub volatility: Arc<VolatilityMonitor>,
    pub ingestor: Arc<RecordIngestor>,
    pub orders: Arc<OrderReporter>,
    pub exchange: Arc<ExchangeInfo>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        source: Arc<dyn AccountDataSource>,
        store: Arc<dyn TimeSeriesStore>,
        notifier: NotificationService,
        exchange: ExchangeInfo,
    ) -> Self {
        Self {
            token_hash: Arc::new(auth::hash_key(&config.http_token)),
            snapshots: Arc::new(SnapshotWriter::new(
                source.clone(),
                store.clone(),
                config.trading_pair.clone(),
                config.reference_pair.clone(),
            )),
            volatility: Arc::new(VolatilityMonitor::new(store.clone(), notifier.clone())),
            ingestor: Arc::new(RecordIngestor::new(
                source.clone(),
                store,
                config.trading_pair.clone(),
            )),
            orders: Arc::new(OrderReporter::new(
                source.clone(),
                notifier,
                config.trading_pair.clone(),
            )),
            source,
            exchange: Arc::new(exchange),
        }
    }
}

/// `{status, data}` envelope used by the monitoring endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            data,
        }
    }

    pub fn failed(data: T) -> Self {
        Self {
            status: "failed",
            data,
        }
    }
}

/// Handler failures. Upstream problems answer 502, bad data 422 and bad
/// input 400, all with the failure envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("Data source error: {0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    InvalidInput(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Monitor(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            AppError::Monitor(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Source(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::error!("Request failed ({}): {}", status, self);

        (status, Json(ApiResponse::failed(self.to_string()))).into_response()
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn build_router(state: AppState) -> Router {
    let gated = margin_routes::margin_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::token_middleware,
    ));

    let quotes = market_routes::quote_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::legacy_token_middleware,
    ));

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/health", get(health))
        .merge(gated)
        .merge(quotes)
        .merge(market_routes::debug_routes())
        .merge(relay_routes::relay_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Install the global tracing subscriber. `RUST_LOG_FORMAT=json` switches to
/// JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            "api_server=info,margin_monitor=info,binance_client=info,snapshot_store=info,notification_service=info,tower_http=info",
        )
    });

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded: {:?}", config);

    let client = BinanceClient::new(
        config.binance_api_key.clone(),
        config.binance_api_secret.clone(),
        config.binance_base_url.clone(),
    )?;
    let exchange = ExchangeInfo {
        source: client.source_name().to_string(),
        base_url: client.base_url().to_string(),
        api_key: client.masked_api_key(),
        trading_pair: config.trading_pair.clone(),
    };

    let store = Arc::new(SqliteStore::new(&config.database_url).await?);
    tracing::info!("Snapshot store ready at {}", config.database_url);

    let notifier = NotificationService::new(&config.notification)?;
    let _change_feed = ChangeEventNotifier::new(store.clone(), notifier.clone()).spawn();

    let state = AppState::new(&config, Arc::new(client), store, notifier, exchange);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Margin monitor listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
