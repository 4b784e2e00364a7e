//! Page automation port
//!
//! The minimal capability the filter controller and extractor need from a
//! headless browser. Elements are addressed by selector plus index so the
//! port never leaks engine-specific element handles.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Page automation error type
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("No element matches {0}")]
    NotFound(Selector),

    #[error("Interaction failed on {selector}: {reason}")]
    Interaction { selector: Selector, reason: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Browser session error: {0}")]
    Session(String),
}

/// Element address understood by every driver
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(s: impl Into<String>) -> Self {
        Selector::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Selector::XPath(s.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css={}", s),
            Selector::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// Headless page capability
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to `url` and wait for the document to load
    async fn goto(&self, url: &str) -> Result<(), DriverError>;

    /// Number of elements currently matching `selector`
    async fn count(&self, selector: &Selector) -> Result<usize, DriverError>;

    /// Wait until at least one element matches `selector`
    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), DriverError>;

    /// Click the `index`-th match of `selector`
    async fn click(&self, selector: &Selector, index: usize) -> Result<(), DriverError>;

    /// Replace the value of the `index`-th match of `selector` with `text`
    async fn fill(&self, selector: &Selector, index: usize, text: &str) -> Result<(), DriverError>;

    /// Send Enter to the focused element
    async fn press_enter(&self) -> Result<(), DriverError>;

    /// Visible text of every element matching `selector`, in document order
    async fn texts(&self, selector: &Selector) -> Result<Vec<String>, DriverError>;

    /// PNG snapshot of the current viewport
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// End the browser session
    async fn close(&self) -> Result<(), DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_display() {
        assert_eq!(Selector::css("div.a").to_string(), "css=div.a");
        assert_eq!(Selector::xpath("//button").to_string(), "xpath=//button");
    }

    #[test]
    fn test_error_display_names_selector() {
        let err = DriverError::Interaction {
            selector: Selector::css("#usd"),
            reason: "element click intercepted".into(),
        };
        assert!(err.to_string().contains("css=#usd"));
        assert!(err.to_string().contains("intercepted"));
    }
}
