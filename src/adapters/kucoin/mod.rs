//! KuCoin Market Data Adapter
//!
//! Recent candlestick data for `{TOKEN}-USDT` pairs.

mod client;
mod types;

pub use client::{KucoinClient, KucoinConfig};
pub use types::CandlesResponse;
