//! Processing of a single dataset record: fill, submit, detect

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::dataset::{FieldMapping, Record};
use crate::detector::ValidationDetector;
use crate::driver::{Page, Query};
use crate::error::HarnessResult;
use crate::filler::FieldFiller;
use crate::locator::LocatorResolver;
use crate::reporter::Reporter;

pub fn default_submit_queries() -> Vec<String> {
    [
        "//button[contains(@class,'slds-button_brand') and (contains(.,'Next') or contains(.,'Submit') or contains(.,'Save') or contains(.,'Create'))]",
        "//button[contains(.,'Next') or contains(.,'Submit') or contains(.,'Save') or contains(.,'Create')]",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// How a row ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The form surfaced a validation error; the expected result for negative data
    ValidationDetected(String),
    /// No submit control could be found
    SubmitMissing,
    /// Submitted without any detectable validation error
    Completed,
    /// A driver or page fault interrupted the row
    Faulted(String),
}

/// Waits used while processing a row
#[derive(Debug, Clone)]
pub struct RowTimings {
    pub fill_pause: Duration,
    pub submit_settle: Duration,
    pub validation_timeout: Duration,
}

pub struct RowProcessor {
    mappings: Vec<FieldMapping>,
    resolver: LocatorResolver,
    filler: FieldFiller,
    detector: ValidationDetector,
    submit_queries: Vec<Query>,
    timings: RowTimings,
}

impl RowProcessor {
    pub fn new(
        mappings: Vec<FieldMapping>,
        resolver: LocatorResolver,
        detector: ValidationDetector,
        submit_queries: Vec<Query>,
        timings: RowTimings,
    ) -> Self {
        Self {
            mappings,
            resolver,
            filler: FieldFiller::new(),
            detector,
            submit_queries,
            timings,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        let t = &config.timings;
        Self::new(
            config.fields.clone(),
            LocatorResolver::from_templates(&config.locator.strategies),
            ValidationDetector::from_xpaths(
                &config.detector.patterns,
                Duration::from_millis(t.poll_interval),
                config.detector.sample_limit,
            ),
            config.submit.queries.iter().map(Query::xpath).collect(),
            RowTimings {
                fill_pause: Duration::from_millis(t.fill_pause),
                submit_settle: Duration::from_millis(t.submit_settle),
                validation_timeout: Duration::from_millis(t.validation_timeout),
            },
        )
    }

    /// Run one record through the form. `index` is 1-based.
    pub async fn process<P: Page>(
        &self,
        page: &P,
        reporter: &mut Reporter,
        record: &Record,
        index: usize,
    ) -> RowOutcome {
        match self.try_process(page, reporter, record).await {
            Ok(outcome) => {
                info!("Row {} -> {:?}", index, outcome);
                outcome
            }
            Err(e) => RowOutcome::Faulted(e.to_string()),
        }
    }

    async fn try_process<P: Page>(
        &self,
        page: &P,
        reporter: &mut Reporter,
        record: &Record,
    ) -> HarnessResult<RowOutcome> {
        for mapping in &self.mappings {
            let value = record.get(&mapping.source);
            match self.resolver.resolve(page, &mapping.hints).await {
                Some(element) => {
                    let report = self.filler.fill(page, &element, value).await;
                    debug!("{}: {}", mapping.tag, report);
                    if report.typed {
                        reporter
                            .info(
                                &format!("Filled_{}", mapping.tag),
                                format!("{}='{}'", mapping.tag, value),
                            )
                            .await;
                    } else {
                        reporter
                            .error(
                                &format!("Fill_Failed_{}", mapping.tag),
                                format!("{}='{}' could not be typed", mapping.tag, value),
                                None,
                            )
                            .await;
                    }
                    // Give inline validators a moment before the next field
                    sleep(self.timings.fill_pause).await;
                }
                None => {
                    reporter
                        .info(
                            &format!("Skip_{}", mapping.tag),
                            format!("Input not found; value='{}'", value),
                        )
                        .await;
                }
            }
        }

        if !self.click_submit(page).await? {
            reporter
                .error("Submit_NotFound", "Submit/Next button not found", None)
                .await;
            return Ok(RowOutcome::SubmitMissing);
        }

        reporter
            .info("Clicked_Submit", "Waiting for validation result")
            .await;
        sleep(self.timings.submit_settle).await;

        let detection = self
            .detector
            .detect(page, self.timings.validation_timeout)
            .await?;
        if detection.found {
            reporter
                .error(
                    "Validation_Error",
                    format!("Detected validation errors:\n{}", detection.sample),
                    None,
                )
                .await;
            return Ok(RowOutcome::ValidationDetected(detection.sample));
        }

        reporter
            .info("No_Inline_Error", "No inline errors detected after submit")
            .await;
        Ok(RowOutcome::Completed)
    }

    /// Click the first submit control found; `false` when none exists.
    async fn click_submit<P: Page>(&self, page: &P) -> HarnessResult<bool> {
        for query in &self.submit_queries {
            match page.find(query).await {
                Ok(Some(button)) => {
                    page.script_click(&button).await?;
                    return Ok(true);
                }
                Ok(None) => {}
                Err(e) => debug!("Submit probe {} failed: {}", query, e),
            }
        }
        Ok(false)
    }
}
