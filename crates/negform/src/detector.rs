//! Post-submit validation error detection

use std::time::Duration;
use tracing::{debug, info};

use crate::driver::{Page, Query};
use crate::error::HarnessResult;
use crate::wait::poll_until;

/// Sample text used when matched elements carry no visible text
pub const PLACEHOLDER_SAMPLE: &str = "(error elements found)";

pub fn default_patterns() -> Vec<String> {
    [
        "//*[@aria-invalid='true']",
        "//*[contains(@class,'slds-has-error')]",
        "//*[contains(., 'Complete this field')]",
        "//*[contains(., 'required') and contains(@class,'slds-form-element__help')]",
        "//*[contains(@class,'slds-form-element__help')]",
        "//*[contains(@class,'error') and (contains(.,'required') or contains(.,'invalid'))]",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Outcome of one detection window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub found: bool,
    pub sample: String,
}

impl Detection {
    pub fn absent() -> Self {
        Self {
            found: false,
            sample: String::new(),
        }
    }

    pub fn found(sample: impl Into<String>) -> Self {
        Self {
            found: true,
            sample: sample.into(),
        }
    }
}

pub struct ValidationDetector {
    patterns: Vec<Query>,
    poll_interval: Duration,
    sample_limit: usize,
}

impl ValidationDetector {
    pub fn new(patterns: Vec<Query>, poll_interval: Duration, sample_limit: usize) -> Self {
        Self {
            patterns,
            poll_interval,
            sample_limit,
        }
    }

    pub fn from_xpaths(xpaths: &[String], poll_interval: Duration, sample_limit: usize) -> Self {
        Self::new(
            xpaths.iter().map(Query::xpath).collect(),
            poll_interval,
            sample_limit,
        )
    }

    /// Poll for any error signal until `timeout` elapses.
    ///
    /// Returns as soon as one pattern matches; confirming absence waits out the
    /// whole window.
    pub async fn detect<P: Page>(&self, page: &P, timeout: Duration) -> HarnessResult<Detection> {
        let hit = poll_until(timeout, self.poll_interval, move || self.poll_once(page)).await?;

        Ok(match hit {
            Some(sample) => {
                info!("Validation signal found");
                Detection::found(sample)
            }
            None => {
                debug!("No validation signal within {:?}", timeout);
                Detection::absent()
            }
        })
    }

    /// Check patterns in order; the first with any match yields its sample.
    async fn poll_once<P: Page>(&self, page: &P) -> HarnessResult<Option<String>> {
        for pattern in &self.patterns {
            let elements = page.find_all(pattern).await?;
            if elements.is_empty() {
                continue;
            }

            debug!("{} matched {} element(s)", pattern, elements.len());
            let mut bits = Vec::new();
            for element in elements.iter().take(self.sample_limit) {
                // Elements can go stale between find and read
                let text = page.text(element).await.unwrap_or_default();
                let text = text.trim();
                if !text.is_empty() {
                    bits.push(text.to_string());
                }
            }

            let sample = if bits.is_empty() {
                PLACEHOLDER_SAMPLE.to_string()
            } else {
                bits.join("\n")
            };
            return Ok(Some(sample));
        }
        Ok(None)
    }
}
