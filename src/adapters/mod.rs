//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - WebDriver: headless browser page over fantoccini
//! - KuCoin: exchange candle client
//! - Gemini: signal-analysis backend client
//! - Telegram: chat notifier
//! - CLI: Command-line interface handlers

pub mod webdriver;
pub mod kucoin;
pub mod gemini;
pub mod telegram;
pub mod cli;

#[cfg(test)]
mod test_server;

pub use webdriver::WebDriverPage;
pub use kucoin::KucoinClient;
pub use gemini::GeminiAnalyzer;
pub use telegram::{ConsoleNotifier, TelegramNotifier};
pub use cli::CliApp;
