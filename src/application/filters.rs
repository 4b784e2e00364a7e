//! Dashboard Filter Controller
//!
//! Brings the whale dashboard into the filtered state (USD floor, value floor,
//! 1-hour window) although its DOM is not stable between deployments. Each
//! filter control carries an ordered table of location strategies; the first
//! strategy that both locates the control and completes its interaction wins.
//! A control whose every strategy fails aborts the whole step, after a
//! snapshot of the page has been written for postmortem.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use super::bounded;
use crate::config::DashboardSection;
use crate::ports::page::{DriverError, PageDriver, Selector};

/// Slack added on top of a driver-side wait so the driver reports its own timeout
const WAIT_GRACE: Duration = Duration::from_millis(500);
/// Bound on taking the diagnostic snapshot
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(10);

/// Why the filter step failed
#[derive(Debug, Error)]
pub enum FilterCause {
    #[error("Could not open dashboard: {0}")]
    Navigation(String),

    #[error("No strategy could operate the {control} control ({})", .attempts.join("; "))]
    ControlUnavailable {
        control: String,
        attempts: Vec<String>,
    },

    #[error("Filtered view never rendered {selector} within {timeout:?}")]
    NotRendered { selector: Selector, timeout: Duration },
}

/// Filter-application failure, fatal to the run
#[derive(Debug, Error)]
#[error("{cause}")]
pub struct FilterError {
    #[source]
    pub cause: FilterCause,
    /// Diagnostic snapshot, when one could be written
    pub snapshot: Option<PathBuf>,
}

/// What a strategy is asked to do with a located element
#[derive(Debug, Clone, Copy)]
pub enum Act<'a> {
    Click,
    Fill(&'a str),
}

/// One way of finding a control on the page
#[async_trait]
pub trait LocateStrategy: Send + Sync + fmt::Debug {
    /// Short label for logs and diagnostics
    fn name(&self) -> String;

    fn selector(&self) -> Selector;

    /// Wait (bounded) for the control and return how many elements match
    async fn try_locate(&self, page: &dyn PageDriver, timeout: Duration) -> Result<usize, DriverError> {
        let selector = self.selector();
        bounded(timeout + WAIT_GRACE, page.wait_for(&selector, timeout)).await?;
        match bounded(timeout, page.count(&selector)).await? {
            0 => Err(DriverError::NotFound(selector)),
            n => Ok(n),
        }
    }

    /// Interact with the `index`-th match
    async fn try_act(
        &self,
        page: &dyn PageDriver,
        index: usize,
        act: Act<'_>,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let selector = self.selector();
        match act {
            Act::Click => bounded(timeout, page.click(&selector, index)).await,
            Act::Fill(text) => bounded(timeout, page.fill(&selector, index, text)).await,
        }
    }
}

/// Quote a string as an XPath literal
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{}'", s)
    } else if !s.contains('"') {
        format!("\"{}\"", s)
    } else {
        let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

fn css_literal(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Element whose own text is exactly `text` (whitespace-normalized)
#[derive(Debug, Clone)]
pub struct TextMatch {
    pub text: String,
}

impl TextMatch {
    pub fn boxed(text: impl Into<String>) -> Box<dyn LocateStrategy> {
        Box::new(Self { text: text.into() })
    }
}

impl LocateStrategy for TextMatch {
    fn name(&self) -> String {
        format!("text={:?}", self.text)
    }

    fn selector(&self) -> Selector {
        Selector::xpath(format!(
            "//*[normalize-space(text())={}]",
            xpath_literal(&self.text)
        ))
    }
}

/// `tag` elements whose own text contains `text`
#[derive(Debug, Clone)]
pub struct TextContains {
    pub tag: String,
    pub text: String,
}

impl TextContains {
    pub fn boxed(tag: impl Into<String>, text: impl Into<String>) -> Box<dyn LocateStrategy> {
        Box::new(Self {
            tag: tag.into(),
            text: text.into(),
        })
    }
}

impl LocateStrategy for TextContains {
    fn name(&self) -> String {
        format!("{}:has-text({:?})", self.tag, self.text)
    }

    fn selector(&self) -> Selector {
        Selector::xpath(format!(
            "//{}[contains(normalize-space(text()), {})]",
            self.tag,
            xpath_literal(&self.text)
        ))
    }
}

/// A fixed structural path (absolute XPath or CSS path)
#[derive(Debug, Clone)]
pub struct StructuralPath {
    pub path: Selector,
}

impl StructuralPath {
    pub fn boxed(path: Selector) -> Box<dyn LocateStrategy> {
        Box::new(Self { path })
    }
}

impl LocateStrategy for StructuralPath {
    fn name(&self) -> String {
        format!("path {}", self.path)
    }

    fn selector(&self) -> Selector {
        self.path.clone()
    }
}

/// `tag` elements whose `attribute` contains `fragment`
#[derive(Debug, Clone)]
pub struct AttributeContains {
    pub tag: String,
    pub attribute: String,
    pub fragment: String,
}

impl AttributeContains {
    pub fn boxed(
        tag: impl Into<String>,
        attribute: impl Into<String>,
        fragment: impl Into<String>,
    ) -> Box<dyn LocateStrategy> {
        Box::new(Self {
            tag: tag.into(),
            attribute: attribute.into(),
            fragment: fragment.into(),
        })
    }
}

impl LocateStrategy for AttributeContains {
    fn name(&self) -> String {
        format!("{}[{}*={:?}]", self.tag, self.attribute, self.fragment)
    }

    fn selector(&self) -> Selector {
        Selector::css(format!(
            "{}[{}*={}]",
            self.tag,
            self.attribute,
            css_literal(&self.fragment)
        ))
    }
}

/// Element with an ARIA role (or the matching HTML element) and accessible name
#[derive(Debug, Clone)]
pub struct RoleName {
    pub role: String,
    pub name: String,
}

impl RoleName {
    pub fn boxed(role: impl Into<String>, name: impl Into<String>) -> Box<dyn LocateStrategy> {
        Box::new(Self {
            role: role.into(),
            name: name.into(),
        })
    }
}

impl LocateStrategy for RoleName {
    fn name(&self) -> String {
        format!("role={}[name={:?}]", self.role, self.name)
    }

    fn selector(&self) -> Selector {
        let role = xpath_literal(&self.role);
        let name = xpath_literal(&self.name);
        Selector::xpath(format!(
            "//*[@role={role} or local-name()={role}][normalize-space(.)={name} or @aria-label={name}]"
        ))
    }
}

/// Interaction a control needs once its trigger is found
#[derive(Debug)]
pub enum ControlAction {
    /// Clicking the trigger applies the filter
    Click,
    /// Clicking the trigger opens an input that must appear, be filled with
    /// `value` and optionally submitted with Enter
    OpenAndFill {
        input: Vec<Box<dyn LocateStrategy>>,
        value: String,
        submit: bool,
    },
}

/// One filter control and its ordered fallback table
#[derive(Debug)]
pub struct FilterControl {
    pub name: String,
    pub triggers: Vec<Box<dyn LocateStrategy>>,
    pub action: ControlAction,
}

/// Default fallback tables for the USD floor, value floor and time window
pub fn default_plan(section: &DashboardSection) -> Vec<FilterControl> {
    let usd = FilterControl {
        name: "USD amount".to_string(),
        triggers: vec![
            TextMatch::boxed("USD"),
            TextContains::boxed("div", "USD"),
            AttributeContains::boxed("*", "class", "UsdFilter"),
            RoleName::boxed("button", "USD"),
        ],
        action: ControlAction::OpenAndFill {
            input: vec![
                StructuralPath::boxed(Selector::xpath(
                    "/html/body/div[2]/div/div/div/div[1]/div[1]/input",
                )),
                StructuralPath::boxed(Selector::css("[role='dialog'] input")),
                AttributeContains::boxed("input", "placeholder", "From"),
            ],
            value: section.min_usd.clone(),
            submit: true,
        },
    };

    let button = |name: &str, label: &str| FilterControl {
        name: name.to_string(),
        triggers: vec![
            RoleName::boxed("button", label),
            TextMatch::boxed(label),
            AttributeContains::boxed("*", "aria-label", label),
        ],
        action: ControlAction::Click,
    };

    vec![
        usd,
        button("value", &section.value_filter_label),
        button("time window", &section.time_window_label),
    ]
}

/// Timing and diagnostics knobs of the controller
#[derive(Debug, Clone)]
pub struct FilterSettings {
    pub attempt_timeout: Duration,
    pub confirm_timeout: Duration,
    pub render_timeout: Duration,
    pub max_candidates: usize,
    pub snapshot_dir: PathBuf,
}

impl From<&DashboardSection> for FilterSettings {
    fn from(section: &DashboardSection) -> Self {
        Self {
            attempt_timeout: section.attempt_timeout(),
            confirm_timeout: section.confirm_timeout(),
            render_timeout: section.render_timeout(),
            max_candidates: section.max_candidates,
            snapshot_dir: section.snapshot_dir(),
        }
    }
}

/// Drives the dashboard into the filtered state
#[derive(Debug)]
pub struct FilterController {
    controls: Vec<FilterControl>,
    token_selector: Selector,
    settings: FilterSettings,
}

impl FilterController {
    pub fn new(controls: Vec<FilterControl>, token_selector: Selector, settings: FilterSettings) -> Self {
        Self {
            controls,
            token_selector,
            settings,
        }
    }

    /// Controller with the default plan for this dashboard section
    pub fn from_section(section: &DashboardSection) -> Self {
        Self::new(
            default_plan(section),
            Selector::css(section.token_selector.clone()),
            FilterSettings::from(section),
        )
    }

    pub fn controls(&self) -> &[FilterControl] {
        &self.controls
    }

    /// Apply every filter control, then confirm token rows are rendering.
    /// On failure a snapshot is written and no partial state is reported as success.
    pub async fn apply_filters(&self, page: &dyn PageDriver) -> Result<(), FilterError> {
        match self.apply_all(page).await {
            Ok(()) => Ok(()),
            Err(cause) => Err(self.fail(page, cause).await),
        }
    }

    /// Wrap `cause` into a `FilterError`, attaching a fresh snapshot
    pub async fn fail(&self, page: &dyn PageDriver, cause: FilterCause) -> FilterError {
        tracing::error!("Filter step failed: {}", cause);
        let snapshot = self.capture_snapshot(page).await;
        FilterError { cause, snapshot }
    }

    async fn apply_all(&self, page: &dyn PageDriver) -> Result<(), FilterCause> {
        for control in &self.controls {
            self.apply_control(page, control).await?;
        }

        bounded(
            self.settings.render_timeout + WAIT_GRACE,
            page.wait_for(&self.token_selector, self.settings.render_timeout),
        )
        .await
        .map_err(|e| {
            tracing::warn!("Token rows did not render: {}", e);
            FilterCause::NotRendered {
                selector: self.token_selector.clone(),
                timeout: self.settings.render_timeout,
            }
        })
    }

    async fn apply_control(&self, page: &dyn PageDriver, control: &FilterControl) -> Result<(), FilterCause> {
        let mut attempts = Vec::with_capacity(control.triggers.len());

        for strategy in &control.triggers {
            match self.run_strategy(page, control, strategy.as_ref()).await {
                Ok(()) => {
                    tracing::info!("{} filter applied via {}", control.name, strategy.name());
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("{} filter: strategy {} failed: {}", control.name, strategy.name(), e);
                    attempts.push(format!("{}: {}", strategy.name(), e));
                }
            }
        }

        Err(FilterCause::ControlUnavailable {
            control: control.name.clone(),
            attempts,
        })
    }

    async fn run_strategy(
        &self,
        page: &dyn PageDriver,
        control: &FilterControl,
        strategy: &dyn LocateStrategy,
    ) -> Result<(), DriverError> {
        let found = strategy.try_locate(page, self.settings.attempt_timeout).await?;
        let candidates = found.min(self.settings.max_candidates);
        tracing::debug!("{}: {} candidate(s), trying {}", strategy.name(), found, candidates);

        let mut last_error = None;
        for index in 0..candidates {
            match self.operate(page, control, strategy, index).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!("{} candidate #{} failed: {}", strategy.name(), index, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| DriverError::NotFound(strategy.selector())))
    }

    async fn operate(
        &self,
        page: &dyn PageDriver,
        control: &FilterControl,
        trigger: &dyn LocateStrategy,
        index: usize,
    ) -> Result<(), DriverError> {
        let attempt = self.settings.attempt_timeout;
        trigger.try_act(page, index, Act::Click, attempt).await?;

        match &control.action {
            ControlAction::Click => Ok(()),
            ControlAction::OpenAndFill { input, value, submit } => {
                self.fill_affordance(page, input, value).await?;
                if *submit {
                    bounded(attempt, page.press_enter()).await?;
                }
                Ok(())
            }
        }
    }

    /// Wait for the input opened by a trigger and fill it. Only the first
    /// input strategy gets the full confirmation window; the affordance has
    /// had its chance to appear by the time later ones run.
    async fn fill_affordance(
        &self,
        page: &dyn PageDriver,
        input: &[Box<dyn LocateStrategy>],
        value: &str,
    ) -> Result<(), DriverError> {
        let mut last_error = DriverError::Timeout(self.settings.confirm_timeout);

        for (i, field) in input.iter().enumerate() {
            let wait = if i == 0 {
                self.settings.confirm_timeout
            } else {
                self.settings.attempt_timeout
            };
            let filled = match field.try_locate(page, wait).await {
                Ok(_) => field.try_act(page, 0, Act::Fill(value), self.settings.attempt_timeout).await,
                Err(e) => Err(e),
            };
            match filled {
                Ok(()) => {
                    tracing::debug!("Filled {:?} via {}", value, field.name());
                    return Ok(());
                }
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }

    /// Write a PNG snapshot of the page into the snapshot directory
    pub async fn capture_snapshot(&self, page: &dyn PageDriver) -> Option<PathBuf> {
        let bytes = match bounded(SNAPSHOT_TIMEOUT, page.screenshot()).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Could not capture diagnostic snapshot: {}", e);
                return None;
            }
        };

        let dir = &self.settings.snapshot_dir;
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            tracing::warn!("Could not create snapshot directory {}: {}", dir.display(), e);
            return None;
        }

        let path = dir.join(format!(
            "filter_error_{}.png",
            Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
        ));
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => {
                tracing::info!("Diagnostic snapshot written to {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Could not write snapshot {}: {}", path.display(), e);
                None
            }
        }
    }
}
