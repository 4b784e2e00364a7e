use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{CandleRow, Verdict};

/// Faults raised while talking to an analysis backend. These never cross the
/// port: implementations fold them into `Verdict::Failure`.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("Backend error (status {status}): {message}")]
    BackendError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Unrecognized response shape: {0}")]
    UnknownShape(String),
}

impl From<reqwest::Error> for AnalyzerError {
    fn from(err: reqwest::Error) -> Self {
        AnalyzerError::HttpError(err.to_string())
    }
}

impl From<AnalyzerError> for Verdict {
    fn from(err: AnalyzerError) -> Self {
        Verdict::failure(err.to_string())
    }
}

/// Turns a candle series into a BUY/SELL/HOLD verdict
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalAnalyzer: Send + Sync {
    /// Never fails: every fault becomes `Verdict::Failure`
    async fn analyze(&self, rows: &[CandleRow], token: &str) -> Verdict;
}
