//! WebDriver Adapter
//!
//! Headless browser automation through a WebDriver endpoint. Start
//! `chromedriver --port=9515` (or geckodriver) before running the pipeline.

mod page;

pub use page::{capabilities, WebDriverPage};
