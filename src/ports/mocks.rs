//! In-memory test doubles for the ports
//!
//! Deterministic, network-free stand-ins used by the integration tests. Each
//! double records the calls it receives so tests can assert on them.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::analyzer::SignalAnalyzer;
use super::market_data::{ChartError, ChartSource};
use super::notifier::Notifier;
use super::page::{DriverError, PageDriver, Selector};
use crate::domain::{CandleRow, Verdict};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A scripted page element
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub text: String,
    pub clickable: bool,
    pub fillable: bool,
    /// Selectors that become present once this element is clicked
    pub reveals: Vec<Selector>,
    /// Clicking takes this long before completing
    pub click_delay: Option<Duration>,
}

impl FakeElement {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn button(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            clickable: true,
            ..Default::default()
        }
    }

    pub fn input() -> Self {
        Self {
            fillable: true,
            clickable: true,
            ..Default::default()
        }
    }

    /// A clickable element that opens `reveals` when clicked
    pub fn trigger(text: impl Into<String>, reveals: Selector) -> Self {
        Self {
            text: text.into(),
            clickable: true,
            reveals: vec![reveals],
            ..Default::default()
        }
    }

    pub fn disabled(mut self) -> Self {
        self.clickable = false;
        self
    }

    pub fn with_click_delay(mut self, delay: Duration) -> Self {
        self.click_delay = Some(delay);
        self
    }
}

/// Everything the fake page was asked to do, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Goto(String),
    Click(Selector, usize),
    Fill(Selector, usize, String),
    Enter,
    Screenshot,
    Close,
}

#[derive(Debug, Default)]
struct FakePageState {
    visible: HashMap<Selector, Vec<FakeElement>>,
    hidden: HashMap<Selector, Vec<FakeElement>>,
    navigation_error: Option<String>,
    read_error: Option<String>,
    close_delay: Option<Duration>,
    events: Vec<PageEvent>,
}

/// Scriptable `PageDriver`
#[derive(Debug, Default)]
pub struct FakePage {
    state: Mutex<FakePageState>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Element present from the start
    pub fn with_element(self, selector: Selector, element: FakeElement) -> Self {
        lock(&self.state)
            .visible
            .entry(selector)
            .or_default()
            .push(element);
        self
    }

    /// Element that only appears once a trigger revealing `selector` is clicked
    pub fn with_hidden(self, selector: Selector, element: FakeElement) -> Self {
        lock(&self.state)
            .hidden
            .entry(selector)
            .or_default()
            .push(element);
        self
    }

    /// One text element per symbol under `selector`
    pub fn with_texts(self, selector: Selector, texts: &[&str]) -> Self {
        texts.iter().fold(self, |page, text| {
            page.with_element(selector.clone(), FakeElement::text(*text))
        })
    }

    pub fn with_navigation_error(self, reason: impl Into<String>) -> Self {
        lock(&self.state).navigation_error = Some(reason.into());
        self
    }

    /// Every `texts` call fails with a session error
    pub fn with_read_error(self, reason: impl Into<String>) -> Self {
        lock(&self.state).read_error = Some(reason.into());
        self
    }

    /// `close` takes this long before completing
    pub fn with_close_delay(self, delay: Duration) -> Self {
        lock(&self.state).close_delay = Some(delay);
        self
    }

    pub fn events(&self) -> Vec<PageEvent> {
        lock(&self.state).events.clone()
    }

    pub fn clicks(&self) -> Vec<(Selector, usize)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PageEvent::Click(s, i) => Some((s, i)),
                _ => None,
            })
            .collect()
    }

    pub fn fills(&self) -> Vec<(Selector, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PageEvent::Fill(s, _, text) => Some((s, text)),
                _ => None,
            })
            .collect()
    }

    pub fn screenshot_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| **e == PageEvent::Screenshot)
            .count()
    }

    pub fn is_closed(&self) -> bool {
        self.events().contains(&PageEvent::Close)
    }

    fn element(&self, selector: &Selector, index: usize) -> Result<FakeElement, DriverError> {
        lock(&self.state)
            .visible
            .get(selector)
            .and_then(|els| els.get(index))
            .cloned()
            .ok_or_else(|| DriverError::NotFound(selector.clone()))
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn goto(&self, url: &str) -> Result<(), DriverError> {
        let mut state = lock(&self.state);
        state.events.push(PageEvent::Goto(url.to_string()));
        match &state.navigation_error {
            Some(reason) => Err(DriverError::Navigation(reason.clone())),
            None => Ok(()),
        }
    }

    async fn count(&self, selector: &Selector) -> Result<usize, DriverError> {
        Ok(lock(&self.state).visible.get(selector).map_or(0, Vec::len))
    }

    async fn wait_for(&self, selector: &Selector, timeout: Duration) -> Result<(), DriverError> {
        // Visibility only changes through clicks, so there is nothing to wait on
        if self.count(selector).await? > 0 {
            Ok(())
        } else {
            Err(DriverError::Timeout(timeout))
        }
    }

    async fn click(&self, selector: &Selector, index: usize) -> Result<(), DriverError> {
        let element = self.element(selector, index)?;
        if let Some(delay) = element.click_delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = lock(&self.state);
        state.events.push(PageEvent::Click(selector.clone(), index));
        if !element.clickable {
            return Err(DriverError::Interaction {
                selector: selector.clone(),
                reason: "element not interactable".into(),
            });
        }
        for revealed in &element.reveals {
            if let Some(els) = state.hidden.remove(revealed) {
                state.visible.entry(revealed.clone()).or_default().extend(els);
            }
        }
        Ok(())
    }

    async fn fill(&self, selector: &Selector, index: usize, text: &str) -> Result<(), DriverError> {
        let element = self.element(selector, index)?;
        let mut state = lock(&self.state);
        state
            .events
            .push(PageEvent::Fill(selector.clone(), index, text.to_string()));
        if element.fillable {
            Ok(())
        } else {
            Err(DriverError::Interaction {
                selector: selector.clone(),
                reason: "element is not editable".into(),
            })
        }
    }

    async fn press_enter(&self) -> Result<(), DriverError> {
        lock(&self.state).events.push(PageEvent::Enter);
        Ok(())
    }

    async fn texts(&self, selector: &Selector) -> Result<Vec<String>, DriverError> {
        let state = lock(&self.state);
        if let Some(reason) = &state.read_error {
            return Err(DriverError::Session(reason.clone()));
        }
        Ok(state
            .visible
            .get(selector)
            .map(|els| els.iter().map(|e| e.text.clone()).collect())
            .unwrap_or_default())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        lock(&self.state).events.push(PageEvent::Screenshot);
        Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
    }

    async fn close(&self) -> Result<(), DriverError> {
        let delay = lock(&self.state).close_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        lock(&self.state).events.push(PageEvent::Close);
        Ok(())
    }
}

/// Notifier that keeps every message
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) {
        lock(&self.messages).push(text.to_string());
    }
}

/// Chart source answering from a fixed table. Unknown tokens get no data.
#[derive(Debug, Default)]
pub struct StaticChartSource {
    charts: HashMap<String, Vec<CandleRow>>,
    errors: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl StaticChartSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chart(mut self, token: &str, rows: Vec<CandleRow>) -> Self {
        self.charts.insert(token.to_uppercase(), rows);
        self
    }

    pub fn with_error(mut self, token: &str, reason: &str) -> Self {
        self.errors.insert(token.to_uppercase(), reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl ChartSource for StaticChartSource {
    async fn fetch_chart(&self, token: &str) -> Result<Vec<CandleRow>, ChartError> {
        let token = token.to_uppercase();
        lock(&self.calls).push(token.clone());
        if let Some(reason) = self.errors.get(&token) {
            return Err(ChartError::RestError(reason.clone()));
        }
        Ok(self.charts.get(&token).cloned().unwrap_or_default())
    }
}

/// Analyzer answering from a fixed table
#[derive(Debug, Default)]
pub struct StaticAnalyzer {
    verdicts: HashMap<String, Verdict>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl StaticAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_verdict(mut self, token: &str, verdict: Verdict) -> Self {
        self.verdicts.insert(token.to_uppercase(), verdict);
        self
    }

    /// `(token, rows received)` per call
    pub fn calls(&self) -> Vec<(String, usize)> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl SignalAnalyzer for StaticAnalyzer {
    async fn analyze(&self, rows: &[CandleRow], token: &str) -> Verdict {
        lock(&self.calls).push((token.to_string(), rows.len()));
        self.verdicts
            .get(&token.to_uppercase())
            .cloned()
            .unwrap_or_else(|| Verdict::failure("no verdict configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_page_reveal_on_click() {
        let popup = Selector::css("input.from");
        let trigger = Selector::css("div.usd");
        let page = FakePage::new()
            .with_element(trigger.clone(), FakeElement::trigger("USD", popup.clone()))
            .with_hidden(popup.clone(), FakeElement::input());

        assert_eq!(page.count(&popup).await.unwrap(), 0);
        page.click(&trigger, 0).await.unwrap();
        assert_eq!(page.count(&popup).await.unwrap(), 1);
        page.fill(&popup, 0, "1000").await.unwrap();
        assert_eq!(page.fills(), vec![(popup, "1000".to_string())]);
    }

    #[tokio::test]
    async fn test_fake_page_disabled_click_fails() {
        let sel = Selector::css("button");
        let page = FakePage::new().with_element(sel.clone(), FakeElement::button("1H").disabled());
        assert!(page.click(&sel, 0).await.is_err());
        assert!(page.click(&sel, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_static_chart_source() {
        let source = StaticChartSource::new()
            .with_chart("doge", vec![CandleRow::new("1", "1", "1", "1", "1", "1")])
            .with_error("bad", "boom");

        assert_eq!(source.fetch_chart("DOGE").await.unwrap().len(), 1);
        assert!(source.fetch_chart("PEPE").await.unwrap().is_empty());
        assert!(source.fetch_chart("BAD").await.is_err());
        assert_eq!(source.calls(), vec!["DOGE", "PEPE", "BAD"]);
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.notify("hello").await;
        assert_eq!(notifier.messages(), vec!["hello"]);
    }
}
