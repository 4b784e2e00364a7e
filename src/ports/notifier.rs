use async_trait::async_trait;
use thiserror::Error;

/// Delivery failure. Logged by the notifier, never returned to callers.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Chat API rejected message (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Fire-and-forget delivery of plain text to one chat destination
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str);
}
