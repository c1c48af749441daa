use crate::models::DepthResponse;
use crate::rate_limit::RateLimiter;
use account_source::{mask_api_key, AccountDataSource, SourceError};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use margin_core::{InterestHistory, MarginTrade, OpenOrder, OrderBookTop, RawIsolatedAccount};
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Requests allowed per minute before the client waits for a slot.
const DEFAULT_REQUESTS_PER_MINUTE: usize = 1200;
const RECV_WINDOW_MS: u64 = 5000;

/// Signed REST client for Binance isolated margin endpoints.
pub struct BinanceClient {
    client: Client,
    base_url: String,
    api_key: String,
    secret_key: String,
    rate_limiter: RateLimiter,
}

impl BinanceClient {
    pub fn new(api_key: String, secret_key: String, base_url: String) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            secret_key,
            rate_limiter: RateLimiter::new(DEFAULT_REQUESTS_PER_MINUTE, Duration::from_secs(60)),
        })
    }

    /// Get the base URL (for logging/diagnostics)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// API key with everything but the first and last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        mask_api_key(&self.api_key)
    }

    /// Hex HMAC-SHA256 of a query string with the secret key.
    pub(crate) fn sign(&self, query: &str) -> Result<String, SourceError> {
        let mut mac = HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| SourceError::Signing(format!("Invalid key length: {}", e)))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, SourceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "X-MBX-APIKEY",
            header::HeaderValue::from_str(&self.api_key)
                .map_err(|_| SourceError::Signing("API key contains invalid header characters".into()))?,
        );
        Ok(headers)
    }

    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{}?{}", self.base_url, path, encode_query(params));
        self.execute(self.client.get(&url)).await
    }

    async fn get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let mut params = params.to_vec();
        params.push(("recvWindow", RECV_WINDOW_MS.to_string()));
        params.push(("timestamp", chrono::Utc::now().timestamp_millis().to_string()));

        let query = encode_query(&params);
        let signature = self.sign(&query)?;
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        self.execute(self.client.get(&url).headers(self.auth_headers()?))
            .await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, SourceError> {
        self.rate_limiter.acquire().await;

        let response = builder
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Binance request failed with HTTP {}: {}", status, body);
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }
}

fn encode_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait]
impl AccountDataSource for BinanceClient {
    async fn order_book_top(&self, symbol: &str) -> Result<OrderBookTop, SourceError> {
        let depth: DepthResponse = self
            .get_public(
                "/api/v3/depth",
                &[("symbol", symbol.to_string()), ("limit", "5".to_string())],
            )
            .await?;
        depth.top(symbol)
    }

    async fn isolated_account(&self) -> Result<RawIsolatedAccount, SourceError> {
        self.get_signed("/sapi/v1/margin/isolated/account", &[]).await
    }

    async fn open_orders(&self, symbol: &str) -> Result<Vec<OpenOrder>, SourceError> {
        self.get_signed(
            "/sapi/v1/margin/openOrders",
            &[("symbol", symbol.to_string()), ("isIsolated", "TRUE".to_string())],
        )
        .await
    }

    async fn trades(&self, symbol: &str) -> Result<Vec<MarginTrade>, SourceError> {
        self.get_signed(
            "/sapi/v1/margin/myTrades",
            &[("symbol", symbol.to_string()), ("isIsolated", "TRUE".to_string())],
        )
        .await
    }

    async fn interest_history(
        &self,
        isolated_symbol: &str,
    ) -> Result<InterestHistory, SourceError> {
        self.get_signed(
            "/sapi/v1/margin/interestHistory",
            &[("isolatedSymbol", isolated_symbol.to_string())],
        )
        .await
    }

    fn source_name(&self) -> &str {
        "binance"
    }
}
