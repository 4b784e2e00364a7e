//! Gemini Analysis Client
//!
//! Sends a token's recent candles to Gemini `generateContent` and folds the
//! answer into a `Verdict`. Every fault (transport, HTTP status, body shape)
//! ends up as `Verdict::Failure`; nothing is propagated to the caller.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::{AnalyzerSection, ConfigError};
use crate::domain::{truncate_rows, CandleRow, Verdict, DEFAULT_CHART_ROWS};
use crate::ports::analyzer::{AnalyzerError, SignalAnalyzer};
use super::parse::{error_message, interpret};
use super::types::GeminiRequest;

/// Gemini client configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// REST base URL, e.g. https://generativelanguage.googleapis.com/v1beta
    pub api_base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
    pub temperature: Option<f32>,
    /// Candle rows embedded in the prompt
    pub max_rows: usize,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(60),
            temperature: None,
            max_rows: DEFAULT_CHART_ROWS,
        }
    }

    /// Build from the analyzer section; fails when no API key was resolved
    pub fn from_section(section: &AnalyzerSection, max_rows: usize) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: section.base_url.trim_end_matches('/').to_string(),
            model: section.model.clone(),
            api_key: section.api_key()?.to_string(),
            timeout: Duration::from_secs(section.timeout_secs),
            temperature: section.temperature,
            max_rows,
        })
    }
}

/// Prompt embedding the token name and at most `max_rows` leading rows
pub fn build_prompt(rows: &[CandleRow], token: &str, max_rows: usize) -> String {
    let chart = truncate_rows(rows, max_rows)
        .iter()
        .map(CandleRow::to_string)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze the following crypto candlestick chart for {token} (USDT pair). \
         Each row includes: time, open, close, low, high, volume. \
         Based on short-term patterns, provide a clear BUY, SELL, or HOLD signal, \
         and briefly explain why.\n\nChart data:\n{chart}"
    )
}

/// Gemini analysis backend client
#[derive(Debug, Clone)]
pub struct GeminiAnalyzer {
    config: GeminiConfig,
    http: Client,
}

impl GeminiAnalyzer {
    pub fn with_config(config: GeminiConfig) -> Result<Self, AnalyzerError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalyzerError::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    /// `generateContent` endpoint for the configured model
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base_url, self.config.model
        )
    }

    async fn request(&self, rows: &[CandleRow], token: &str) -> Result<Verdict, AnalyzerError> {
        let prompt = build_prompt(rows, token, self.config.max_rows);
        let request = GeminiRequest::from_prompt(prompt, self.config.temperature);

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| error_message(&v))
                .unwrap_or_else(|| body.chars().take(300).collect());
            return Err(AnalyzerError::BackendError {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| AnalyzerError::ParseError(e.to_string()))?;

        Ok(interpret(&value))
    }
}

#[async_trait]
impl SignalAnalyzer for GeminiAnalyzer {
    async fn analyze(&self, rows: &[CandleRow], token: &str) -> Verdict {
        match self.request(rows, token).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!("Gemini analysis failed for {}: {}", token, e);
                e.into()
            }
        }
    }
}
