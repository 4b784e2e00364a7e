//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/whale_scout.toml.
//! Secrets left empty in the file are filled from the process environment once,
//! here, so components only ever see the resolved `Config`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::domain::candle::DEFAULT_CHART_ROWS;
use crate::domain::tally::DEFAULT_MATERIALITY_THRESHOLD;

/// Environment variable holding the Telegram bot token
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
/// Environment variable holding the Telegram chat id
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
/// Environment variable holding the Gemini API key
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dashboard: DashboardSection,
    #[serde(default)]
    pub browser: BrowserSection,
    #[serde(default)]
    pub exchange: ExchangeSection,
    #[serde(default)]
    pub analyzer: AnalyzerSection,
    #[serde(default)]
    pub telegram: TelegramSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

/// Whale dashboard and filter configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardSection {
    /// Dashboard page URL
    pub url: String,
    /// Page load timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Delay after navigation before touching the filters (client-side rendering)
    pub settle_secs: u64,
    /// Delay after the filters are applied before reading token rows
    pub render_wait_secs: u64,
    /// CSS selector of the rendered token-symbol elements
    pub token_selector: String,
    /// Minimum USD amount typed into the USD filter popup
    pub min_usd: String,
    /// Visible label of the value-floor button
    pub value_filter_label: String,
    /// Visible label of the time-window button
    pub time_window_label: String,
    /// Bound on every single locate/click/fill attempt, in milliseconds
    pub attempt_timeout_ms: u64,
    /// Bound on waiting for a popup input after its trigger was clicked
    pub confirm_timeout_ms: u64,
    /// Bound on waiting for token rows once all filters are applied
    pub render_timeout_ms: u64,
    /// Matches tried per strategy before moving to the next strategy
    pub max_candidates: usize,
    /// Directory receiving diagnostic snapshots (supports `~`)
    pub snapshot_dir: String,
}

impl Default for DashboardSection {
    fn default() -> Self {
        Self {
            url: "https://intel.arkm.com".to_string(),
            navigation_timeout_secs: 60,
            settle_secs: 10,
            render_wait_secs: 5,
            token_selector: "div[class*='TokenSymbol']".to_string(),
            min_usd: "1000".to_string(),
            value_filter_label: "VALUE ≥ 0.1".to_string(),
            time_window_label: "1H".to_string(),
            attempt_timeout_ms: 3_000,
            confirm_timeout_ms: 5_000,
            render_timeout_ms: 15_000,
            max_candidates: 25,
            snapshot_dir: ".".to_string(),
        }
    }
}

impl DashboardSection {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn render_wait(&self) -> Duration {
        Duration::from_secs(self.render_wait_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// Snapshot directory with `~` expanded
    pub fn snapshot_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.snapshot_dir).into_owned())
    }
}

/// WebDriver session configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    /// WebDriver endpoint (chromedriver / geckodriver)
    pub webdriver_url: String,
    /// "chrome" or "firefox"
    pub browser: String,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            browser: "chrome".to_string(),
            headless: true,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

/// Exchange market-data configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeSection {
    /// KuCoin REST base URL
    pub base_url: String,
    /// Candle interval ("1min", "5min", ...)
    pub interval: String,
    pub timeout_secs: u64,
}

impl Default for ExchangeSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.kucoin.com".to_string(),
            interval: "1min".to_string(),
            timeout_secs: 15,
        }
    }
}

/// Generative analysis backend configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerSection {
    /// Gemini REST base URL (up to and excluding `/models`)
    pub base_url: String,
    pub model: String,
    /// API key; falls back to GEMINI_API_KEY
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Optional sampling temperature
    pub temperature: Option<f32>,
}

impl Default for AnalyzerSection {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            timeout_secs: 60,
            temperature: None,
        }
    }
}

impl AnalyzerSection {
    /// Resolved API key, required to build the analyzer client
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        non_empty(&self.api_key).ok_or(ConfigError::MissingSecret(ENV_GEMINI_API_KEY))
    }
}

/// Telegram notification configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramSection {
    pub api_base: String,
    /// Bot token; falls back to TELEGRAM_TOKEN
    pub bot_token: Option<String>,
    /// Destination chat; falls back to TELEGRAM_CHAT_ID
    pub chat_id: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TelegramSection {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: None,
            chat_id: None,
            timeout_secs: 10,
        }
    }
}

impl TelegramSection {
    /// Resolved `(bot_token, chat_id)`, required to build the notifier
    pub fn credentials(&self) -> Result<(&str, &str), ConfigError> {
        let token = non_empty(&self.bot_token).ok_or(ConfigError::MissingSecret(ENV_TELEGRAM_TOKEN))?;
        let chat = non_empty(&self.chat_id).ok_or(ConfigError::MissingSecret(ENV_TELEGRAM_CHAT_ID))?;
        Ok((token, chat))
    }
}

/// Pipeline policy configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Mentions a token needs before it is analyzed
    pub materiality_threshold: u32,
    /// Candle rows forwarded to the analyzer
    pub chart_rows: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            materiality_threshold: DEFAULT_MATERIALITY_THRESHOLD,
            chart_rows: DEFAULT_CHART_ROWS,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Missing secret: set {0} or the matching config key")]
    MissingSecret(&'static str),
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Load configuration from a TOML file, overlay secrets from the environment
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Fill secrets that are empty in the file from `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fill(&mut self.telegram.bot_token, lookup(ENV_TELEGRAM_TOKEN));
        fill(&mut self.telegram.chat_id, lookup(ENV_TELEGRAM_CHAT_ID));
        fill(&mut self.analyzer.api_key, lookup(ENV_GEMINI_API_KEY));
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        let urls = [
            ("dashboard.url", &self.dashboard.url),
            ("browser.webdriver_url", &self.browser.webdriver_url),
            ("exchange.base_url", &self.exchange.base_url),
            ("analyzer.base_url", &self.analyzer.base_url),
            ("telegram.api_base", &self.telegram.api_base),
        ];
        for (key, value) in urls {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!("{} cannot be empty", key)));
            }
        }

        if self.dashboard.token_selector.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "dashboard.token_selector cannot be empty".to_string(),
            ));
        }

        if self.dashboard.attempt_timeout_ms == 0
            || self.dashboard.confirm_timeout_ms == 0
            || self.dashboard.render_timeout_ms == 0
            || self.dashboard.navigation_timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "dashboard timeouts must be > 0".to_string(),
            ));
        }

        if self.dashboard.max_candidates == 0 {
            return Err(ConfigError::ValidationError(
                "dashboard.max_candidates must be > 0".to_string(),
            ));
        }

        if !matches!(self.browser.browser.as_str(), "chrome" | "firefox") {
            return Err(ConfigError::ValidationError(format!(
                "browser.browser must be \"chrome\" or \"firefox\", got {:?}",
                self.browser.browser
            )));
        }

        if self.exchange.timeout_secs == 0
            || self.analyzer.timeout_secs == 0
            || self.telegram.timeout_secs == 0
        {
            return Err(ConfigError::ValidationError(
                "HTTP timeouts must be > 0".to_string(),
            ));
        }

        if self.pipeline.materiality_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.materiality_threshold must be > 0".to_string(),
            ));
        }

        if self.pipeline.chart_rows == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.chart_rows must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if non_empty(slot).is_none() {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            *slot = Some(v);
        }
    }
}
