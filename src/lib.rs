//! Whale Scout - whale-transaction dashboard watcher
//!
//! Filters a whale-transfer dashboard, tallies the tokens behind clustered
//! large transfers and posts a per-token trading signal to chat.
//!
//! # Modules
//!
//! - `domain`: Core types (CandleRow, TokenTally, Action, Verdict)
//! - `ports`: Trait abstractions (PageDriver, ChartSource, SignalAnalyzer, Notifier)
//! - `adapters`: External implementations (WebDriver, KuCoin, Gemini, Telegram, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Filter controller, token extractor and pipeline

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
