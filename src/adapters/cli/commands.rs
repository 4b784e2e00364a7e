//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the whale-scout pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::gemini::{GeminiAnalyzer, GeminiConfig};
use crate::adapters::kucoin::KucoinClient;
use crate::adapters::telegram::{ConsoleNotifier, TelegramConfig, TelegramNotifier};
use crate::adapters::webdriver::WebDriverPage;
use crate::application::{format_no_chart, format_verdict, Pipeline, RunOutcome};
use crate::config::{load_config, Config};
use crate::domain::{trading_pair, truncate_rows};
use crate::ports::analyzer::SignalAnalyzer;
use crate::ports::market_data::ChartSource;
use crate::ports::notifier::Notifier;

const DEFAULT_CONFIG: &str = "config/whale_scout.toml";

/// Whale Scout - whale-transfer watcher and signal notifier
#[derive(Parser, Debug)]
#[command(
    name = "whale-scout",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watches a whale-transaction dashboard and reports trading signals",
    long_about = "Whale Scout filters a whale-transaction dashboard, tallies the tokens \
                  behind clustered large transfers, pulls their exchange candles and \
                  posts a BUY/SELL/HOLD recommendation per token to Telegram."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one full pipeline pass
    Run(RunCmd),

    /// Print the candle rows for a token
    Chart(ChartCmd),

    /// Fetch a token's chart and print the analyzer verdict
    Analyze(AnalyzeCmd),
}

/// One pipeline pass
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Print messages to stdout instead of posting to Telegram
    #[arg(long)]
    pub dry_run: bool,
}

/// Print candles
#[derive(Parser, Debug)]
pub struct ChartCmd {
    /// Token symbol (e.g., DOGE)
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Only print the rows the analyzer would receive
    #[arg(long)]
    pub trimmed: bool,
}

/// Analyze one token
#[derive(Parser, Debug)]
pub struct AnalyzeCmd {
    /// Token symbol (e.g., DOGE)
    #[arg(value_name = "TOKEN")]
    pub token: String,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    /// Also send the message to Telegram
    #[arg(long)]
    pub notify: bool,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    init_logging(app.verbose, app.debug)?;

    match app.command {
        Command::Run(cmd) => run_command(cmd).await,
        Command::Chart(cmd) => chart_command(cmd).await,
        Command::Analyze(cmd) => analyze_command(cmd).await,
    }
}

/// Initialize logging system
fn init_logging(verbose: bool, debug: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}

fn load(path: &Path) -> Result<Config> {
    load_config(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn chart_source(config: &Config) -> Result<KucoinClient> {
    KucoinClient::from_section(&config.exchange).context("Failed to create exchange client")
}

fn analyzer(config: &Config) -> Result<GeminiAnalyzer> {
    let gemini = GeminiConfig::from_section(&config.analyzer, config.pipeline.chart_rows)?;
    GeminiAnalyzer::with_config(gemini).context("Failed to create analyzer client")
}

fn telegram(config: &Config) -> Result<TelegramNotifier> {
    let telegram = TelegramConfig::from_section(&config.telegram)?;
    TelegramNotifier::with_config(telegram).context("Failed to create Telegram client")
}

/// Handle run command
async fn run_command(cmd: RunCmd) -> Result<()> {
    tracing::info!("Starting whale-scout run");
    let config = load(&cmd.config)?;

    let notifier: Arc<dyn Notifier> = if cmd.dry_run {
        tracing::warn!("DRY RUN - messages are printed, not sent");
        Arc::new(ConsoleNotifier)
    } else {
        Arc::new(telegram(&config)?)
    };

    let pipeline = Pipeline::from_config(
        &config,
        Arc::new(chart_source(&config)?),
        Arc::new(analyzer(&config)?),
        notifier,
    );

    let page = WebDriverPage::connect(&config.browser, config.dashboard.navigation_timeout())
        .await
        .context("Failed to start browser session (is the WebDriver server running?)")?;

    match pipeline.run(&page).await {
        RunOutcome::Completed(summary) => {
            println!(
                "✓ Run complete: {} qualifying token(s), {} analysed, {} failed, {} without chart",
                summary.qualifying.len(),
                summary.analysed,
                summary.failed,
                summary.no_chart
            );
            Ok(())
        }
        RunOutcome::Aborted(err) => {
            if let Some(path) = &err.snapshot {
                eprintln!("Snapshot: {}", path.display());
            }
            bail!("Run aborted: {}", err)
        }
        RunOutcome::ExtractionFailed(err) => bail!("Run failed reading token rows: {}", err),
    }
}

/// Handle chart command
async fn chart_command(cmd: ChartCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    let client = chart_source(&config)?;
    let pair = trading_pair(&cmd.token);

    let rows = client
        .fetch_chart(&cmd.token)
        .await
        .with_context(|| format!("Failed to fetch candles for {}", pair))?;

    if rows.is_empty() {
        println!("{}", format_no_chart(&pair));
        return Ok(());
    }

    let rows = if cmd.trimmed {
        truncate_rows(&rows, config.pipeline.chart_rows)
    } else {
        &rows[..]
    };

    println!("{} ({} interval, {} rows)", pair, client.interval(), rows.len());
    println!("time,open,close,low,high,volume");
    for row in rows {
        println!("{}", row);
    }
    Ok(())
}

/// Handle analyze command
async fn analyze_command(cmd: AnalyzeCmd) -> Result<()> {
    let config = load(&cmd.config)?;
    let token = cmd.token.trim().to_uppercase();
    let pair = trading_pair(&token);

    let rows = chart_source(&config)?
        .fetch_chart(&token)
        .await
        .with_context(|| format!("Failed to fetch candles for {}", pair))?;

    let message = if rows.is_empty() {
        format_no_chart(&pair)
    } else {
        let verdict = analyzer(&config)?
            .analyze(truncate_rows(&rows, config.pipeline.chart_rows), &token)
            .await;
        format_verdict(&token, &verdict)
    };

    println!("{}", message);
    if cmd.notify {
        telegram(&config)?.notify(&message).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_app_parse_run() {
        let app = CliApp::try_parse_from(["whale-scout", "run"]).unwrap();
        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from(DEFAULT_CONFIG));
                assert!(!cmd.dry_run);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_app_parse_run_dry_run() {
        let app =
            CliApp::try_parse_from(["whale-scout", "run", "--dry-run", "-c", "custom.toml"]).unwrap();
        match app.command {
            Command::Run(cmd) => {
                assert!(cmd.dry_run);
                assert_eq!(cmd.config, PathBuf::from("custom.toml"));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_app_parse_chart() {
        let app = CliApp::try_parse_from(["whale-scout", "chart", "doge", "--trimmed"]).unwrap();
        match app.command {
            Command::Chart(cmd) => {
                assert_eq!(cmd.token, "doge");
                assert!(cmd.trimmed);
            }
            _ => panic!("Expected Chart command"),
        }
    }

    #[test]
    fn test_cli_app_parse_analyze_with_notify() {
        let app = CliApp::try_parse_from(["whale-scout", "analyze", "PEPE", "--notify"]).unwrap();
        match app.command {
            Command::Analyze(cmd) => {
                assert_eq!(cmd.token, "PEPE");
                assert!(cmd.notify);
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_chart_requires_token() {
        assert!(CliApp::try_parse_from(["whale-scout", "chart"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let app = CliApp::try_parse_from(["whale-scout", "--debug", "run", "-v"]).unwrap();
        assert!(app.debug);
        assert!(app.verbose);
    }
}
