use async_trait::async_trait;
use thiserror::Error;

use crate::domain::CandleRow;

/// Market data error type
#[derive(Error, Debug)]
pub enum ChartError {
    #[error("REST API error: {0}")]
    RestError(String),

    #[error("Data parsing error: {0}")]
    ParseError(String),
}

impl From<reqwest::Error> for ChartError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChartError::ParseError(err.to_string())
        } else {
            ChartError::RestError(err.to_string())
        }
    }
}

/// Source of recent candlestick data
///
/// An exchange that does not list the token answers with an empty series,
/// not an error: absence of chart data is an expected outcome.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChartSource: Send + Sync {
    /// Most recent candles for `token`, newest first as the exchange returns them
    async fn fetch_chart(&self, token: &str) -> Result<Vec<CandleRow>, ChartError>;
}
