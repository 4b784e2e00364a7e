//! Telegram Notification Adapter

mod client;

pub use client::{clip_message, ConsoleNotifier, TelegramConfig, TelegramNotifier, MAX_MESSAGE_CHARS};
