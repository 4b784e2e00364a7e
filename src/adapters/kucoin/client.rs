//! KuCoin Market Data Client
//!
//! HTTP client for the public KuCoin candles endpoint. One request per token,
//! no retries: a failed fetch is reported as missing chart data.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;

use crate::config::ExchangeSection;
use crate::domain::{trading_pair, CandleRow};
use crate::ports::market_data::{ChartError, ChartSource};
use super::types::CandlesResponse;

/// KuCoin client configuration
#[derive(Debug, Clone)]
pub struct KucoinConfig {
    /// Base URL for the KuCoin REST API
    pub api_base_url: String,
    /// Candle interval, e.g. "1min"
    pub interval: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for KucoinConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.kucoin.com".to_string(),
            interval: "1min".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl From<&ExchangeSection> for KucoinConfig {
    fn from(section: &ExchangeSection) -> Self {
        Self {
            api_base_url: section.base_url.trim_end_matches('/').to_string(),
            interval: section.interval.clone(),
            timeout: Duration::from_secs(section.timeout_secs),
        }
    }
}

/// KuCoin candles client
#[derive(Debug, Clone)]
pub struct KucoinClient {
    config: KucoinConfig,
    http: Client,
}

impl KucoinClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self, ChartError> {
        Self::with_config(KucoinConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: KucoinConfig) -> Result<Self, ChartError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChartError::RestError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn from_section(section: &ExchangeSection) -> Result<Self, ChartError> {
        Self::with_config(KucoinConfig::from(section))
    }

    /// Candles URL for a trading pair
    pub fn candles_url(&self) -> String {
        format!("{}/api/v1/market/candles", self.config.api_base_url)
    }

    /// Fetch candles for an exchange pair such as `DOGE-USDT`.
    /// Non-success status means the pair has no data, not an error.
    pub async fn get_candles(&self, pair: &str, interval: &str) -> Result<Vec<CandleRow>, ChartError> {
        let response = self
            .http
            .get(self.candles_url())
            .query(&[("type", interval), ("symbol", pair)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::info!("KuCoin returned {} for {}, treating as no chart data", status, pair);
            return Ok(Vec::new());
        }

        let body: CandlesResponse = response
            .json()
            .await
            .map_err(|e| ChartError::ParseError(format!("Failed to parse candles: {}", e)))?;

        if body.data.is_empty() {
            tracing::debug!(
                "No candles for {} (code: {:?}, msg: {:?})",
                pair,
                body.code,
                body.msg
            );
        }

        Ok(body.into_rows())
    }

    pub fn interval(&self) -> &str {
        &self.config.interval
    }
}

#[async_trait]
impl ChartSource for KucoinClient {
    async fn fetch_chart(&self, token: &str) -> Result<Vec<CandleRow>, ChartError> {
        let pair = trading_pair(token);
        self.get_candles(&pair, &self.config.interval).await
    }
}
