//! Negative-data form validation harness
//!
//! Drives a browser over WebDriver through a login, onto a data-entry form,
//! and then feeds every row of a CSV dataset into that form, checking that
//! the form rejects it with an inline validation error.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     RunController                           │
//! │    ├── FormNavigator::login / open_form                     │
//! │    └── per row: open_form -> RowProcessor::process          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  RowProcessor                                               │
//! │    ├── LocatorResolver::resolve(hints)  -> element          │
//! │    ├── FieldFiller::fill(element, value)                    │
//! │    ├── submit                                               │
//! │    └── ValidationDetector::detect(timeout)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Reporter: step records, screenshots, run.log, report.json, │
//! │            <run>_artifacts.zip                              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All browser access goes through the [`Page`] trait; [`WebDriverPage`] is
//! the fantoccini-backed implementation.

pub mod config;
pub mod dataset;
pub mod detector;
pub mod driver;
pub mod error;
pub mod filler;
pub mod locator;
pub mod reporter;
pub mod row;
pub mod runner;
pub mod session;
pub mod wait;
pub mod webdriver;

pub use config::HarnessConfig;
pub use dataset::{Dataset, FieldMapping, Record};
pub use detector::{Detection, ValidationDetector};
pub use driver::{Page, Query, ScreenCapture};
pub use error::{HarnessError, HarnessResult};
pub use filler::{FieldFiller, FillReport};
pub use locator::LocatorResolver;
pub use reporter::{Reporter, StepRecord};
pub use row::{RowOutcome, RowProcessor};
pub use runner::{execute, RunController, RunPhase, RunSummary};
pub use session::{Credentials, FormNavigator};
pub use webdriver::WebDriverPage;
