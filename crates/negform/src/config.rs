//! Harness configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::dataset::{default_field_mappings, FieldMapping};
use crate::detector::default_patterns;
use crate::error::HarnessResult;
use crate::locator::default_strategies;
use crate::row::default_submit_queries;

/// Harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Where the target application lives
    pub target: TargetConfig,

    /// WebDriver session settings
    pub browser: BrowserConfig,

    /// Form entry navigation
    pub form: FormConfig,

    /// Waits and settle delays
    pub timings: Timings,

    /// Artifact output
    pub report: ReportConfig,

    pub locator: LocatorConfig,

    pub detector: DetectorConfig,

    pub submit: SubmitConfig,

    /// Field mapping table, applied in order to every record
    pub fields: Vec<FieldMapping>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig::default(),
            browser: BrowserConfig::default(),
            form: FormConfig::default(),
            timings: Timings::default(),
            report: ReportConfig::default(),
            locator: LocatorConfig::default(),
            detector: DetectorConfig::default(),
            submit: SubmitConfig::default(),
            fields: default_field_mappings(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub login_url: String,
    pub home_url: String,

    /// Substrings of the post-login URL that mark a successful redirect
    pub redirect_markers: Vec<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            login_url: "https://test.salesforce.com/".to_string(),
            home_url: "https://chumley--staging.sandbox.lightning.force.com/lightning/page/home"
                .to_string(),
            redirect_markers: vec!["lightning".to_string(), "setup".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// chromedriver endpoint
    pub webdriver_url: String,

    pub headless: bool,

    /// Width and height; `None` starts maximized
    pub window_size: Option<[u32; 2]>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            window_size: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    /// Text of the option that leads to the form under test
    pub entry_option_text: String,

    /// Fewer text/email/tel inputs than this means the form did not load
    pub min_inputs: usize,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            entry_option_text: "Create Domestic Customer".to_string(),
            min_inputs: 3,
        }
    }
}

/// All waits, in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    pub login_timeout: u64,
    pub mfa_probe: u64,
    pub mfa_wait: u64,
    pub post_login_settle: u64,
    pub home_settle: u64,
    pub form_settle: u64,
    pub fill_pause: u64,
    pub submit_settle: u64,
    pub validation_timeout: u64,
    pub poll_interval: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            login_timeout: 30_000,
            mfa_probe: 10_000,
            mfa_wait: 40_000,
            post_login_settle: 2_000,
            home_settle: 3_000,
            form_settle: 4_000,
            fill_pause: 200,
            submit_settle: 2_000,
            validation_timeout: 6_000,
            poll_interval: 250,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Parent of every run directory and archive
    pub artifacts_dir: PathBuf,

    /// Prefix of the run name
    pub run_base: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("artifacts"),
            run_base: "NegFillValidate".to_string(),
        }
    }
}

/// XPath templates; `{q}` is replaced by the quoted hint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub strategies: Vec<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Error-signal XPaths, most specific first
    pub patterns: Vec<String>,

    /// Matched elements sampled for text
    pub sample_limit: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            patterns: default_patterns(),
            sample_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    pub queries: Vec<String>,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            queries: default_submit_queries(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from file, falling back to defaults when it is absent
    pub fn load(path: &Path) -> HarnessResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> HarnessResult<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> HarnessResult<()> {
        use crate::error::HarnessError;

        if self.timings.poll_interval == 0 {
            return Err(HarnessError::Config("timings.poll_interval must be > 0".into()));
        }
        if self.locator.strategies.iter().any(|s| !s.contains("{q}")) {
            return Err(HarnessError::Config(
                "every locator strategy needs a {q} placeholder".into(),
            ));
        }
        if self.submit.queries.is_empty() {
            return Err(HarnessError::Config("submit.queries is empty".into()));
        }
        if let Some(field) = self.fields.iter().find(|f| f.hints.is_empty()) {
            return Err(HarnessError::Config(format!(
                "field '{}' has no hints",
                field.tag
            )));
        }
        Ok(())
    }
}
