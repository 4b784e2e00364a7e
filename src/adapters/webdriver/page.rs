//! WebDriver Page
//!
//! `PageDriver` over a WebDriver session (chromedriver or geckodriver) using
//! fantoccini. Elements are looked up fresh for every call, so stale handles
//! never survive a re-render.

use std::time::Duration;
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};

use crate::config::BrowserSection;
use crate::ports::page::{DriverError, PageDriver, Selector};

/// WebDriver key code for Enter
const KEY_ENTER: &str = "\u{e007}";

const CLICK_SCRIPT: &str = "arguments[0].scrollIntoView({block: 'center'}); arguments[0].click();";

/// WebDriver capabilities for the configured browser
pub fn capabilities(section: &BrowserSection) -> Map<String, Value> {
    let size = format!("--window-size={},{}", section.window_width, section.window_height);
    let caps = match section.browser.as_str() {
        "firefox" => {
            let mut args = vec![];
            if section.headless {
                args.push("-headless".to_string());
            }
            json!({
                "browserName": "firefox",
                "moz:firefoxOptions": { "args": args }
            })
        }
        _ => {
            let mut args = vec![size, "--disable-gpu".to_string(), "--no-sandbox".to_string()];
            if section.headless {
                args.push("--headless=new".to_string());
            }
            json!({
                "browserName": "chrome",
                "goog:chromeOptions": { "args": args }
            })
        }
    };
    match caps {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn locator(selector: &Selector) -> Locator<'_> {
    match selector {
        Selector::Css(s) => Locator::Css(s),
        Selector::XPath(s) => Locator::XPath(s),
    }
}

fn session_error(e: CmdError) -> DriverError {
    DriverError::Session(e.to_string())
}

/// A live WebDriver-backed page
#[derive(Debug, Clone)]
pub struct WebDriverPage {
    client: Client,
    navigation_timeout: Duration,
}

impl WebDriverPage {
    /// Open a new browser session
    pub async fn connect(
        section: &BrowserSection,
        navigation_timeout: Duration,
    ) -> Result<Self, DriverError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(capabilities(section));
        let client = builder
            .connect(&section.webdriver_url)
            .await
            .map_err(|e| DriverError::Session(format!("{}: {}", section.webdriver_url, e)))?;

        if let Err(e) = client
            .set_window_size(section.window_width, section.window_height)
            .await
        {
            tracing::debug!("Could not resize browser window: {}", e);
        }

        tracing::info!(
            "WebDriver session opened ({}, headless: {})",
            section.browser,
            section.headless
        );
        Ok(Self {
            client,
            navigation_timeout,
        })
    }

    async fn nth(&self, selector: &Selector, index: usize) -> Result<Element, DriverError> {
        let elements = self
            .client
            .find_all(locator(selector))
            .await
            .map_err(session_error)?;
        elements
            .into_iter()
            .nth(index)
            .ok_or_else(|| DriverError::NotFound(selector.clone()))
    }
}

#[async_trait]
impl PageDriver for WebDriverPage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        match tokio::time::timeout(self.navigation_timeout, self.client.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DriverError::Navigation(e.to_string())),
            Err(_) => Err(DriverError::Navigation(format!(
                "{} did not load within {:?}",
                url, self.navigation_timeout
            ))),
        }
    }

    async fn count(&self, selector: &Selector) -> Result<usize, DriverError> {
        self.client
            .find_all(locator(selector))
            .await
            .map(|els| els.len())
            .map_err(session_error)
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), DriverError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(locator(selector))
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(DriverError::Timeout(timeout)),
            Err(e) => Err(session_error(e)),
        }
    }

    async fn click(&self, selector: &Selector, index: usize) -> Result<(), DriverError> {
        let element = self.nth(selector, index).await?;
        let native = match element.click().await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        // Overlays and zero-size wrappers reject native clicks; dispatch from script instead
        tracing::debug!("Native click on {} failed ({}), dispatching via script", selector, native);
        let arg = serde_json::to_value(&element).map_err(|e| DriverError::Interaction {
            selector: selector.clone(),
            reason: e.to_string(),
        })?;
        self.client
            .execute(CLICK_SCRIPT, vec![arg])
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Interaction {
                selector: selector.clone(),
                reason: format!("{}; script click: {}", native, e),
            })
    }

    async fn fill(&self, selector: &Selector, index: usize, text: &str) -> Result<(), DriverError> {
        let element = self.nth(selector, index).await?;
        let interaction = |e: CmdError| DriverError::Interaction {
            selector: selector.clone(),
            reason: e.to_string(),
        };
        element.clear().await.map_err(interaction)?;
        element.send_keys(text).await.map_err(interaction)
    }

    async fn press_enter(&self) -> Result<(), DriverError> {
        let focused = self.client.active_element().await.map_err(session_error)?;
        focused.send_keys(KEY_ENTER).await.map_err(session_error)
    }

    async fn texts(&self, selector: &Selector) -> Result<Vec<String>, DriverError> {
        let elements = self
            .client
            .find_all(locator(selector))
            .await
            .map_err(session_error)?;

        let mut texts = Vec::with_capacity(elements.len());
        for element in elements {
            match element.text().await {
                Ok(text) => texts.push(text),
                // rows re-render under us; a detached element is just skipped
                Err(e) => tracing::debug!("Skipping unreadable element under {}: {}", selector, e),
            }
        }
        Ok(texts)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.client.screenshot().await.map_err(session_error)
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.client.clone().close().await.map_err(session_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_capabilities() {
        let caps = capabilities(&BrowserSection::default());
        assert_eq!(caps["browserName"], "chrome");
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
        assert!(args.iter().any(|a| a == "--window-size=1920,1080"));
    }

    #[test]
    fn test_firefox_headful_capabilities() {
        let section = BrowserSection {
            browser: "firefox".to_string(),
            headless: false,
            ..Default::default()
        };
        let caps = capabilities(&section);
        assert_eq!(caps["browserName"], "firefox");
        assert!(caps["moz:firefoxOptions"]["args"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_locator_mapping() {
        let css = Selector::css("div.a");
        assert!(matches!(locator(&css), Locator::Css("div.a")));
        let xpath = Selector::xpath("//button");
        assert!(matches!(locator(&xpath), Locator::XPath("//button")));
    }

    #[tokio::test]
    async fn test_connect_without_driver_fails() {
        let section = BrowserSection {
            webdriver_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        };
        let result = WebDriverPage::connect(&section, Duration::from_secs(1)).await;
        assert!(matches!(result, Err(DriverError::Session(_))));
    }
}
