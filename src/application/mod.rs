//! Application Layer
//!
//! Filter controller, token extractor and the pipeline that sequences them.

use std::future::Future;
use std::time::Duration;

use crate::ports::page::DriverError;

pub mod extractor;
pub mod filters;
pub mod pipeline;

pub use extractor::TokenExtractor;
pub use filters::{
    default_plan, AttributeContains, ControlAction, FilterCause, FilterControl, FilterController,
    FilterError, FilterSettings, LocateStrategy, RoleName, StructuralPath, TextContains, TextMatch,
};
pub use pipeline::{
    format_extraction_failure, format_filter_failure, format_no_chart, format_verdict, Pipeline, PipelinePhase,
    PipelineSettings, RunOutcome, RunSummary, TokenOutcome,
};

/// Await a driver call, failing with `DriverError::Timeout` past `limit`
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, DriverError>
where
    F: Future<Output = Result<T, DriverError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(DriverError::Timeout(limit)))
}
