//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    load_config, AnalyzerSection, BrowserSection, Config, ConfigError, DashboardSection,
    ExchangeSection, PipelineSection, TelegramSection,
};
