//! Gemini Signal Analyzer Adapter
//!
//! Asks Gemini for a short-term BUY/SELL/HOLD call on a candle series and
//! normalizes the heterogeneous response shapes into a `Verdict`.

mod client;
mod parse;
mod types;

pub use client::{build_prompt, GeminiAnalyzer, GeminiConfig};
pub use parse::{interpret, parse_response};
pub use types::GeminiRequest;
