//! Whale Scout - whale-transfer watcher and signal notifier
//!
//! One pass per invocation: filter the dashboard, tally tokens, analyze and notify.

use anyhow::Result;

use whale_scout::adapters::cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets (TELEGRAM_TOKEN, TELEGRAM_CHAT_ID, GEMINI_API_KEY) may live in .env
    dotenvy::dotenv().ok();

    let app = cli::init();
    cli::execute(app).await
}
