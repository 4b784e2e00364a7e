//! Candle rows and trading-pair naming
//!
//! Raw candlestick rows as the exchange returns them. Values are kept as the
//! exchange's own strings; nothing downstream does arithmetic on them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quote currency every dashboard token is paired against on the exchange
pub const QUOTE_CURRENCY: &str = "USDT";

/// Number of rows forwarded to the analyzer by default
pub const DEFAULT_CHART_ROWS: usize = 20;

/// One candlestick: `(time, open, close, low, high, volume)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleRow {
    pub time: String,
    pub open: String,
    pub close: String,
    pub low: String,
    pub high: String,
    pub volume: String,
}

impl CandleRow {
    pub fn new(
        time: impl Into<String>,
        open: impl Into<String>,
        close: impl Into<String>,
        low: impl Into<String>,
        high: impl Into<String>,
        volume: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            open: open.into(),
            close: close.into(),
            low: low.into(),
            high: high.into(),
            volume: volume.into(),
        }
    }

    /// Build a row from exchange cells. Extra trailing cells are ignored;
    /// fewer than six cells is not a row.
    pub fn from_cells(cells: &[String]) -> Option<Self> {
        match cells {
            [time, open, close, low, high, volume, ..] => Some(Self::new(
                time.as_str(),
                open.as_str(),
                close.as_str(),
                low.as_str(),
                high.as_str(),
                volume.as_str(),
            )),
            _ => None,
        }
    }
}

impl fmt::Display for CandleRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.time, self.open, self.close, self.low, self.high, self.volume
        )
    }
}

/// Keep at most `limit` leading rows, preserving order
pub fn truncate_rows(rows: &[CandleRow], limit: usize) -> &[CandleRow] {
    &rows[..rows.len().min(limit)]
}

/// Exchange trading pair for a dashboard token, e.g. `doge` -> `DOGE-USDT`
pub fn trading_pair(token: &str) -> String {
    format!("{}-{}", token.to_uppercase(), QUOTE_CURRENCY)
}
