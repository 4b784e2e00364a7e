//! Pipeline Orchestrator
//!
//! One pass: open the dashboard, apply filters, tally token mentions, then for
//! each qualifying token fetch its chart, analyze it and notify. A filter
//! failure aborts the run with one diagnostic message; per-token faults are
//! reported and the loop moves on.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::bounded;
use super::extractor::TokenExtractor;
use super::filters::{FilterCause, FilterController, FilterError};
use crate::config::Config;
use crate::domain::{trading_pair, truncate_rows, Action, Verdict};
use crate::ports::analyzer::SignalAnalyzer;
use crate::ports::market_data::ChartSource;
use crate::ports::notifier::Notifier;
use crate::ports::page::{DriverError, PageDriver};

const CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Format the chat message for a verdict
pub fn format_verdict(token: &str, verdict: &Verdict) -> String {
    match verdict {
        Verdict::Recommendation { action, rationale } => {
            format!("📊 Analysis for {}:\n{} {}", token, action, rationale)
                .trim_end()
                .to_string()
        }
        Verdict::Failure { detail } => format!("❌ Analysis failed for {}: {}", token, detail),
    }
}

pub fn format_no_chart(pair: &str) -> String {
    format!("⚠️ No chart data for {}.", pair)
}

pub fn format_filter_failure(err: &FilterError) -> String {
    let mut text = format!("❌ Could not apply dashboard filters. Error:\n{}", err);
    if let Some(path) = &err.snapshot {
        text.push_str(&format!("\nSnapshot: {}", path.display()));
    }
    text
}

pub fn format_extraction_failure(err: &DriverError) -> String {
    format!("❌ Could not read token rows: {}", err)
}

/// Where the run currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelinePhase {
    Init,
    Filtering,
    Aborted,
    Extracting,
    PerTokenLoop { current: usize, total: usize },
    Done,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelinePhase::Init => write!(f, "init"),
            PipelinePhase::Filtering => write!(f, "filtering"),
            PipelinePhase::Aborted => write!(f, "aborted"),
            PipelinePhase::Extracting => write!(f, "extracting"),
            PipelinePhase::PerTokenLoop { current, total } => {
                write!(f, "token {}/{}", current, total)
            }
            PipelinePhase::Done => write!(f, "done"),
        }
    }
}

/// Result of one token's chart/analyze/notify sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOutcome {
    Analysed(Action),
    AnalysisFailed,
    NoChart,
}

/// Counters for a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Distinct symbols seen on the filtered page
    pub symbols_seen: usize,
    /// Tokens at or above the materiality threshold, in processing order
    pub qualifying: Vec<(String, u32)>,
    pub analysed: usize,
    pub failed: usize,
    pub no_chart: usize,
}

impl RunSummary {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            symbols_seen: 0,
            qualifying: Vec::new(),
            analysed: 0,
            failed: 0,
            no_chart: 0,
        }
    }

    fn record(&mut self, outcome: TokenOutcome) {
        match outcome {
            TokenOutcome::Analysed(_) => self.analysed += 1,
            TokenOutcome::AnalysisFailed => self.failed += 1,
            TokenOutcome::NoChart => self.no_chart += 1,
        }
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    Aborted(FilterError),
    /// Filters applied but the token rows could not be read
    ExtractionFailed(DriverError),
}

impl RunOutcome {
    /// True when the run stopped before the per-token loop
    pub fn is_aborted(&self) -> bool {
        !matches!(self, RunOutcome::Completed(_))
    }
}

/// Run-level knobs
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub dashboard_url: String,
    /// Pause after navigation for the dashboard scripts to settle
    pub settle_delay: Duration,
    /// Pause after filtering before the rows are read
    pub render_wait: Duration,
    pub materiality_threshold: u32,
    pub chart_rows: usize,
    /// Upper bound on closing the browser session
    pub close_timeout: Duration,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            dashboard_url: config.dashboard.url.clone(),
            settle_delay: config.dashboard.settle_delay(),
            render_wait: config.dashboard.render_wait(),
            materiality_threshold: config.pipeline.materiality_threshold,
            chart_rows: config.pipeline.chart_rows,
            close_timeout: CLOSE_TIMEOUT,
        }
    }
}

/// Sequences filtering, extraction and per-token analysis
pub struct Pipeline {
    controller: FilterController,
    extractor: TokenExtractor,
    charts: Arc<dyn ChartSource>,
    analyzer: Arc<dyn SignalAnalyzer>,
    notifier: Arc<dyn Notifier>,
    settings: PipelineSettings,
    phase: RwLock<PipelinePhase>,
}

impl Pipeline {
    pub fn new(
        controller: FilterController,
        extractor: TokenExtractor,
        charts: Arc<dyn ChartSource>,
        analyzer: Arc<dyn SignalAnalyzer>,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            controller,
            extractor,
            charts,
            analyzer,
            notifier,
            settings,
            phase: RwLock::new(PipelinePhase::Init),
        }
    }

    /// Pipeline wired with the default filter plan from `config`
    pub fn from_config(
        config: &Config,
        charts: Arc<dyn ChartSource>,
        analyzer: Arc<dyn SignalAnalyzer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::new(
            FilterController::from_section(&config.dashboard),
            TokenExtractor::from_section(&config.dashboard),
            charts,
            analyzer,
            notifier,
            PipelineSettings::from(config),
        )
    }

    pub async fn phase(&self) -> PipelinePhase {
        self.phase.read().await.clone()
    }

    async fn enter(&self, phase: PipelinePhase) {
        tracing::info!("Phase: {}", phase);
        *self.phase.write().await = phase;
    }

    /// Run one full pass. The page is closed before returning, whatever the outcome.
    pub async fn run(&self, page: &dyn PageDriver) -> RunOutcome {
        let outcome = self.execute(page).await;
        if let Err(e) = bounded(self.settings.close_timeout, page.close()).await {
            tracing::warn!("Could not close browser session: {}", e);
        }
        outcome
    }

    async fn execute(&self, page: &dyn PageDriver) -> RunOutcome {
        let mut summary = RunSummary::new(Utc::now());

        self.enter(PipelinePhase::Filtering).await;
        if let Err(err) = self.open_and_filter(page).await {
            self.enter(PipelinePhase::Aborted).await;
            self.notifier.notify(&format_filter_failure(&err)).await;
            return RunOutcome::Aborted(err);
        }

        self.enter(PipelinePhase::Extracting).await;
        tokio::time::sleep(self.settings.render_wait).await;
        let tally = match self.extractor.extract_tokens(page).await {
            Ok(tally) => tally,
            Err(e) => {
                tracing::error!("Could not read token rows: {}", e);
                self.enter(PipelinePhase::Aborted).await;
                self.notifier.notify(&format_extraction_failure(&e)).await;
                return RunOutcome::ExtractionFailed(e);
            }
        };
        summary.symbols_seen = tally.len();
        summary.qualifying = tally.qualifying(self.settings.materiality_threshold);

        let skipped = tally.len() - summary.qualifying.len();
        if skipped > 0 {
            tracing::debug!(
                "{} symbol(s) below threshold {}",
                skipped,
                self.settings.materiality_threshold
            );
        }
        if summary.qualifying.is_empty() {
            tracing::info!("No token reached {} mentions", self.settings.materiality_threshold);
        }

        let qualifying = summary.qualifying.clone();
        for (i, (token, count)) in qualifying.iter().enumerate() {
            let total = qualifying.len();
            self.enter(PipelinePhase::PerTokenLoop { current: i + 1, total }).await;
            let outcome = self.process_token(token, *count).await;
            summary.record(outcome);
        }

        summary.finished_at = Utc::now();
        self.enter(PipelinePhase::Done).await;
        tracing::info!(
            "Run finished in {}s: {} analysed, {} failed, {} without chart",
            summary.elapsed().num_seconds(),
            summary.analysed,
            summary.failed,
            summary.no_chart
        );
        RunOutcome::Completed(summary)
    }

    async fn open_and_filter(&self, page: &dyn PageDriver) -> Result<(), FilterError> {
        tracing::info!("Opening {}", self.settings.dashboard_url);
        if let Err(e) = page.goto(&self.settings.dashboard_url).await {
            return Err(self
                .controller
                .fail(page, FilterCause::Navigation(e.to_string()))
                .await);
        }
        tokio::time::sleep(self.settings.settle_delay).await;
        self.controller.apply_filters(page).await
    }

    /// Chart, analysis and notification for one token. Never fails the run.
    pub async fn process_token(&self, token: &str, count: u32) -> TokenOutcome {
        let pair = trading_pair(token);
        tracing::info!("{} mentioned {} times, fetching {}", token, count, pair);

        let rows = match self.charts.fetch_chart(token).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Chart fetch for {} failed: {}", pair, e);
                Vec::new()
            }
        };

        if rows.is_empty() {
            self.notifier.notify(&format_no_chart(&pair)).await;
            return TokenOutcome::NoChart;
        }

        let rows = truncate_rows(&rows, self.settings.chart_rows);
        let verdict = self.analyzer.analyze(rows, token).await;
        self.notifier.notify(&format_verdict(token, &verdict)).await;

        match verdict {
            Verdict::Recommendation { action, .. } => {
                tracing::info!("{}: {}", token, action);
                TokenOutcome::Analysed(action)
            }
            Verdict::Failure { detail } => {
                tracing::warn!("Analysis for {} failed: {}", token, detail);
                TokenOutcome::AnalysisFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::filters::{ControlAction, FilterControl, FilterSettings, StructuralPath};
    use crate::domain::CandleRow;
    use crate::ports::analyzer::MockSignalAnalyzer;
    use crate::ports::market_data::{ChartError, MockChartSource};
    use crate::ports::mocks::{FakeElement, FakePage};
    use crate::ports::notifier::MockNotifier;
    use crate::ports::page::Selector;
    use tempfile::TempDir;

    fn tokens() -> Selector {
        Selector::css("div.token")
    }

    fn candles(n: usize) -> Vec<CandleRow> {
        (0..n)
            .map(|i| CandleRow::new(i.to_string(), "1", "2", "0.5", "2.5", "100"))
            .collect()
    }

    fn pipeline(
        dir: &TempDir,
        charts: MockChartSource,
        analyzer: MockSignalAnalyzer,
        notifier: MockNotifier,
    ) -> Pipeline {
        let controller = FilterController::new(
            vec![FilterControl {
                name: "time window".to_string(),
                triggers: vec![StructuralPath::boxed(Selector::css("#window"))],
                action: ControlAction::Click,
            }],
            tokens(),
            FilterSettings {
                attempt_timeout: Duration::from_millis(50),
                confirm_timeout: Duration::from_millis(50),
                render_timeout: Duration::from_millis(50),
                max_candidates: 3,
                snapshot_dir: dir.path().to_path_buf(),
            },
        );
        Pipeline::new(
            controller,
            TokenExtractor::new(tokens()),
            Arc::new(charts),
            Arc::new(analyzer),
            Arc::new(notifier),
            PipelineSettings {
                dashboard_url: "https://dashboard.test".to_string(),
                settle_delay: Duration::ZERO,
                render_wait: Duration::ZERO,
                materiality_threshold: 5,
                chart_rows: 20,
                close_timeout: Duration::from_millis(100),
            },
        )
    }

    fn page_with(symbols: &[&str]) -> FakePage {
        FakePage::new()
            .with_element(Selector::css("#window"), FakeElement::button("1H"))
            .with_texts(tokens(), symbols)
    }

    #[test]
    fn test_message_formats() {
        assert_eq!(
            format_verdict("DOGE", &Verdict::recommendation(Action::Buy, "momentum up")),
            "📊 Analysis for DOGE:\nBUY momentum up"
        );
        assert_eq!(
            format_verdict("DOGE", &Verdict::failure("HTTP 500")),
            "❌ Analysis failed for DOGE: HTTP 500"
        );
        assert_eq!(format_no_chart("PEPE-USDT"), "⚠️ No chart data for PEPE-USDT.");
    }

    #[test]
    fn test_filter_failure_message_names_snapshot() {
        let err = FilterError {
            cause: FilterCause::Navigation("dns".to_string()),
            snapshot: Some("/tmp/filter_error_x.png".into()),
        };
        let text = format_filter_failure(&err);
        assert!(text.starts_with("❌ Could not apply dashboard filters. Error:\n"));
        assert!(text.contains("dns"));
        assert!(text.ends_with("/tmp/filter_error_x.png"));
    }

    #[tokio::test]
    async fn test_below_threshold_is_dropped_silently() {
        let dir = TempDir::new().unwrap();
        let mut charts = MockChartSource::new();
        charts
            .expect_fetch_chart()
            .withf(|token| token == "DOGE")
            .times(1)
            .returning(|_| Ok(candles(3)));
        let mut analyzer = MockSignalAnalyzer::new();
        analyzer
            .expect_analyze()
            .withf(|rows, token| rows.len() == 3 && token == "DOGE")
            .times(1)
            .returning(|_, _| Verdict::recommendation(Action::Hold, "flat"));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|text| text.starts_with("📊 Analysis for DOGE:"))
            .times(1)
            .return_const(());

        let mut symbols = vec!["DOGE"; 7];
        symbols.extend(["SHIB"; 3]);
        let page = page_with(&symbols);
        let pipeline = pipeline(&dir, charts, analyzer, notifier);

        match pipeline.run(&page).await {
            RunOutcome::Completed(summary) => {
                assert_eq!(summary.qualifying, vec![("DOGE".to_string(), 7)]);
                assert_eq!(summary.symbols_seen, 2);
                assert_eq!(summary.analysed, 1);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(pipeline.phase().await, PipelinePhase::Done);
        assert!(page.is_closed());
    }

    #[tokio::test]
    async fn test_chart_error_reported_as_no_chart() {
        let dir = TempDir::new().unwrap();
        let mut charts = MockChartSource::new();
        charts
            .expect_fetch_chart()
            .times(1)
            .returning(|_| Err(ChartError::RestError("connection reset".into())));
        let mut analyzer = MockSignalAnalyzer::new();
        analyzer.expect_analyze().times(0);
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|text| text == "⚠️ No chart data for PEPE-USDT.")
            .times(1)
            .return_const(());

        let pipeline = pipeline(&dir, charts, analyzer, notifier);
        assert_eq!(pipeline.process_token("PEPE", 6).await, TokenOutcome::NoChart);
    }

    #[tokio::test]
    async fn test_analyzer_receives_at_most_chart_rows() {
        let dir = TempDir::new().unwrap();
        let mut charts = MockChartSource::new();
        charts.expect_fetch_chart().returning(|_| Ok(candles(50)));
        let mut analyzer = MockSignalAnalyzer::new();
        analyzer
            .expect_analyze()
            .withf(|rows, _| rows.len() == 20 && rows[0].time == "0" && rows[19].time == "19")
            .times(1)
            .returning(|_, _| Verdict::failure("backend down"));
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|text| text == "❌ Analysis failed for ETH: backend down")
            .times(1)
            .return_const(());

        let pipeline = pipeline(&dir, charts, analyzer, notifier);
        assert_eq!(pipeline.process_token("ETH", 9).await, TokenOutcome::AnalysisFailed);
    }

    #[tokio::test]
    async fn test_filter_failure_aborts_before_token_work() {
        let dir = TempDir::new().unwrap();
        let mut charts = MockChartSource::new();
        charts.expect_fetch_chart().times(0);
        let mut analyzer = MockSignalAnalyzer::new();
        analyzer.expect_analyze().times(0);
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|text| text.starts_with("❌ Could not apply dashboard filters."))
            .times(1)
            .return_const(());

        // rows are present but the filter control is not
        let page = FakePage::new().with_texts(tokens(), &["DOGE"; 9]);
        let pipeline = pipeline(&dir, charts, analyzer, notifier);

        let outcome = pipeline.run(&page).await;
        assert!(outcome.is_aborted());
        assert_eq!(pipeline.phase().await, PipelinePhase::Aborted);
        assert_eq!(page.screenshot_count(), 1);
        assert!(page.is_closed());
    }

    #[tokio::test]
    async fn test_navigation_failure_aborts() {
        let dir = TempDir::new().unwrap();
        let mut charts = MockChartSource::new();
        charts.expect_fetch_chart().times(0);
        let analyzer = MockSignalAnalyzer::new();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|text| text.contains("net::ERR_NAME_NOT_RESOLVED"))
            .times(1)
            .return_const(());

        let page = page_with(&["DOGE"; 9]).with_navigation_error("net::ERR_NAME_NOT_RESOLVED");
        let pipeline = pipeline(&dir, charts, analyzer, notifier);

        match pipeline.run(&page).await {
            RunOutcome::Aborted(err) => {
                assert!(matches!(err.cause, FilterCause::Navigation(_)));
                assert!(err.snapshot.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreadable_rows_fail_the_run_with_one_message() {
        let dir = TempDir::new().unwrap();
        let mut charts = MockChartSource::new();
        charts.expect_fetch_chart().times(0);
        let mut analyzer = MockSignalAnalyzer::new();
        analyzer.expect_analyze().times(0);
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|text| {
                text.starts_with("❌ Could not read token rows: ") && text.contains("session lost")
            })
            .times(1)
            .return_const(());

        let page = page_with(&["DOGE"; 9]).with_read_error("session lost");
        let pipeline = pipeline(&dir, charts, analyzer, notifier);

        let outcome = pipeline.run(&page).await;
        assert!(outcome.is_aborted());
        match outcome {
            RunOutcome::ExtractionFailed(err) => assert!(matches!(err, DriverError::Session(_))),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(pipeline.phase().await, PipelinePhase::Aborted);
        // filters succeeded, so no diagnostic snapshot
        assert_eq!(page.screenshot_count(), 0);
        assert!(page.is_closed());
    }

    #[tokio::test]
    async fn test_hung_close_does_not_block_the_run() {
        let dir = TempDir::new().unwrap();
        let charts = MockChartSource::new();
        let analyzer = MockSignalAnalyzer::new();
        let notifier = MockNotifier::new();

        // nothing reaches the threshold, so no collaborator is called
        let page = page_with(&["DOGE"; 2]).with_close_delay(Duration::from_secs(30));
        let pipeline = pipeline(&dir, charts, analyzer, notifier);

        let outcome = tokio::time::timeout(Duration::from_secs(5), pipeline.run(&page))
            .await
            .expect("run should return once the close bound elapses");
        assert!(!outcome.is_aborted());
        assert_eq!(pipeline.phase().await, PipelinePhase::Done);
        assert!(!page.is_closed());
    }
}
