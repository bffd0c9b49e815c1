//! Run controller: login, navigate, then every dataset row against a fresh form

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::HarnessConfig;
use crate::dataset::Dataset;
use crate::driver::{Page, ScreenCapture};
use crate::error::HarnessResult;
use crate::reporter::Reporter;
use crate::row::{RowOutcome, RowProcessor};
use crate::session::{Credentials, FormNavigator};

/// Where a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RunPhase {
    Login,
    NavigateForm,
    ReloadForm { row: usize },
    Complete,
    Critical,
}

/// Per-outcome row counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowTally {
    pub attempted: usize,
    pub validation_detected: usize,
    pub submit_missing: usize,
    pub no_error: usize,
    pub faulted: usize,
}

impl RowTally {
    fn record(&mut self, outcome: &RowOutcome) {
        self.attempted += 1;
        match outcome {
            RowOutcome::ValidationDetected(_) => self.validation_detected += 1,
            RowOutcome::SubmitMissing => self.submit_missing += 1,
            RowOutcome::Completed => self.no_error += 1,
            RowOutcome::Faulted(_) => self.faulted += 1,
        }
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_name: String,
    pub run_dir: PathBuf,
    pub phase: RunPhase,
    pub rows_total: usize,
    pub rows: RowTally,
    pub archive: Option<PathBuf>,
}

impl RunSummary {
    pub fn completed(&self) -> bool {
        self.phase == RunPhase::Complete
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} ended at {:?}", self.run_name, self.phase)?;
        writeln!(
            f,
            "  rows: {}/{} attempted, {} validation error(s), {} submit missing, {} without error, {} faulted",
            self.rows.attempted,
            self.rows_total,
            self.rows.validation_detected,
            self.rows.submit_missing,
            self.rows.no_error,
            self.rows.faulted
        )?;
        match &self.archive {
            Some(path) => write!(f, "  artifacts: {}", path.display()),
            None => write!(f, "  artifacts: {} (archive not written)", self.run_dir.display()),
        }
    }
}

pub struct RunController {
    navigator: FormNavigator,
    processor: RowProcessor,
}

impl RunController {
    pub fn new(navigator: FormNavigator, processor: RowProcessor) -> Self {
        Self {
            navigator,
            processor,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            FormNavigator::new(
                config.target.clone(),
                config.form.clone(),
                config.timings.clone(),
            ),
            RowProcessor::from_config(config),
        )
    }

    /// Drive the run, turning a panic anywhere inside into a `Critical` step.
    pub async fn run<P: Page>(
        &self,
        page: &P,
        reporter: &mut Reporter,
        credentials: &Credentials,
        dataset: &Dataset,
    ) -> (RunPhase, RowTally) {
        let mut tally = RowTally::default();
        let driven = AssertUnwindSafe(self.drive(page, reporter, credentials, dataset, &mut tally))
            .catch_unwind()
            .await;

        match driven {
            Ok(phase) => (phase, tally),
            Err(panic) => {
                let detail = panic_message(panic.as_ref());
                reporter
                    .error("Critical", "Fatal error", Some(detail.as_str()))
                    .await;
                (RunPhase::Critical, tally)
            }
        }
    }

    async fn drive<P: Page>(
        &self,
        page: &P,
        reporter: &mut Reporter,
        credentials: &Credentials,
        dataset: &Dataset,
        tally: &mut RowTally,
    ) -> RunPhase {
        if !self.navigator.login(page, reporter, credentials).await {
            return RunPhase::Login;
        }
        if !self.navigator.open_form(page, reporter).await {
            return RunPhase::NavigateForm;
        }

        let total = dataset.len();
        for (i, record) in dataset.records().iter().enumerate() {
            let row = i + 1;
            reporter.info("Row_Start", format!("Row {}/{}", row, total)).await;

            // Always start from a fresh form so stale error UI cannot leak into detection
            if !self.navigator.open_form(page, reporter).await {
                reporter
                    .error(
                        "Form_Reload_Failed",
                        format!("Row {}: Could not reload form", row),
                        None,
                    )
                    .await;
                return RunPhase::ReloadForm { row };
            }

            let outcome = self.processor.process(page, reporter, record, row).await;
            classify(reporter, row, &outcome).await;
            tally.record(&outcome);
        }

        reporter.info("Run_Complete", "Finished all rows").await;
        RunPhase::Complete
    }
}

/// Record the outcome step for one row. No outcome stops the run.
async fn classify(reporter: &mut Reporter, row: usize, outcome: &RowOutcome) {
    match outcome {
        RowOutcome::ValidationDetected(_) => {
            reporter
                .error(
                    &format!("Row_{}_Stopped", row),
                    "Validation error detected",
                    None,
                )
                .await
        }
        RowOutcome::SubmitMissing => {
            reporter
                .error(&format!("Row_{}_Stopped", row), "Submit button not found", None)
                .await
        }
        RowOutcome::Completed => {
            reporter
                .info(
                    &format!("Row_{}_Done", row),
                    "No errors detected; unusual for negative data",
                )
                .await
        }
        RowOutcome::Faulted(detail) => {
            reporter
                .error(
                    &format!("Row_{}_Exception", row),
                    "Unexpected exception",
                    Some(detail.as_str()),
                )
                .await
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

/// Full run over an open browser session.
///
/// Artifacts are finalized and the session is closed on every path out,
/// including aborted runs.
pub async fn execute<P: Page + 'static>(
    config: &HarnessConfig,
    page: Arc<P>,
    credentials: &Credentials,
    dataset: &Dataset,
) -> HarnessResult<RunSummary> {
    let capture: Arc<dyn ScreenCapture> = page.clone();
    let mut reporter = match Reporter::start(capture, &config.report) {
        Ok(reporter) => reporter,
        Err(e) => {
            close_session(page.as_ref()).await;
            return Err(e);
        }
    };

    let controller = RunController::from_config(config);
    let (phase, rows) = controller
        .run(page.as_ref(), &mut reporter, credentials, dataset)
        .await;

    let archive = match reporter.finalize() {
        Ok(path) => Some(path),
        Err(e) => {
            error!("Could not seal run artifacts: {}", e);
            None
        }
    };
    close_session(page.as_ref()).await;

    let summary = RunSummary {
        run_name: reporter.run_name().to_string(),
        run_dir: reporter.run_dir().to_path_buf(),
        phase,
        rows_total: dataset.len(),
        rows,
        archive,
    };
    info!("{}", summary);
    Ok(summary)
}

async fn close_session<P: Page>(page: &P) {
    if let Err(e) = page.close().await {
        warn!("Closing browser session failed: {}", e);
    }
}
