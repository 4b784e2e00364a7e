//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - The headless browser page
//! - Exchange candle data
//! - The signal-analysis backend
//! - Chat notifications

pub mod page;
pub mod market_data;
pub mod analyzer;
pub mod notifier;
pub mod mocks;

// Re-export main traits and types
pub use page::{DriverError, PageDriver, Selector};
pub use market_data::{ChartError, ChartSource};
pub use analyzer::{AnalyzerError, SignalAnalyzer};
pub use notifier::{NotifyError, Notifier};
