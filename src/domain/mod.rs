//! Domain Layer - Core types for the whale-scout pipeline
//!
//! Pure types and logic with no external dependencies.
//! All external interactions happen through the ports layer.

pub mod candle;
pub mod signal;
pub mod tally;

pub use candle::{trading_pair, truncate_rows, CandleRow, DEFAULT_CHART_ROWS, QUOTE_CURRENCY};
pub use signal::{Action, Verdict};
pub use tally::{normalize_symbol, TokenTally, DEFAULT_MATERIALITY_THRESHOLD};
