//! Telegram Notifier
//!
//! Posts plain-text messages to one chat through the Bot API `sendMessage`
//! method. Delivery is best-effort: failures are logged and dropped, there is
//! no retry.

use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;

use crate::config::{ConfigError, TelegramSection};
use crate::ports::notifier::{NotifyError, Notifier};

/// Telegram rejects messages longer than this many characters
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Telegram client configuration
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: String,
    pub timeout: Duration,
}

impl TelegramConfig {
    /// Build from the telegram section; fails when credentials are missing
    pub fn from_section(section: &TelegramSection) -> Result<Self, ConfigError> {
        let (bot_token, chat_id) = section.credentials()?;
        Ok(Self {
            api_base: section.api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            timeout: Duration::from_secs(section.timeout_secs),
        })
    }
}

/// Clip `text` to Telegram's limit without splitting a character
pub fn clip_message(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Telegram Bot API notifier
#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    config: TelegramConfig,
    http: Client,
}

impl TelegramNotifier {
    pub fn with_config(config: TelegramConfig) -> Result<Self, NotifyError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.config.api_base, self.config.bot_token)
    }

    /// Send one message, surfacing the failure (used by `notify`)
    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(self.send_message_url())
            .form(&[("chat_id", self.config.chat_id.as_str()), ("text", clip_message(text))])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("Telegram notification sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) {
        if let Err(e) = self.send_message(text).await {
            // the bot token is part of the URL; reqwest errors may echo it
            let reason = e.to_string().replace(&self.config.bot_token, "<token>");
            tracing::warn!("Dropping Telegram notification: {}", reason);
        }
    }
}

/// Prints messages to stdout instead of sending them (`run --dry-run`)
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, text: &str) {
        println!("{}\n", text);
    }
}
