//! Token Extractor
//!
//! Reads the token symbol of every rendered transfer row and tallies them.

use std::time::Duration;

use super::bounded;
use crate::config::DashboardSection;
use crate::domain::TokenTally;
use crate::ports::page::{DriverError, PageDriver, Selector};

const READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct TokenExtractor {
    selector: Selector,
    read_timeout: Duration,
}

impl TokenExtractor {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            read_timeout: READ_TIMEOUT,
        }
    }

    pub fn from_section(section: &DashboardSection) -> Self {
        Self::new(Selector::css(section.token_selector.clone()))
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Tally the symbols currently rendered. Reading only; zero matching rows
    /// is an empty tally, a driver fault is an error.
    pub async fn extract_tokens(&self, page: &dyn PageDriver) -> Result<TokenTally, DriverError> {
        let texts = bounded(self.read_timeout, page.texts(&self.selector)).await?;
        let tally = TokenTally::from_texts(&texts);
        tracing::info!(
            "Extracted {} symbol(s), {} distinct",
            tally.total(),
            tally.len()
        );
        Ok(tally)
    }
}
