//! Run artifacts: per-step screenshots, structured step log, text log, archive

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::config::ReportConfig;
use crate::driver::ScreenCapture;
use crate::error::HarnessResult;

pub const REPORT_FILE: &str = "report.json";
pub const LOG_FILE: &str = "run.log";

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\-.]+").expect("static regex"));

/// Screenshot-safe form of a step name
pub fn sanitize_step_name(name: &str) -> String {
    UNSAFE_CHARS
        .replace_all(&name.trim().to_lowercase(), "_")
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Info,
    Error,
}

impl Level {
    fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Error => "ERROR",
        }
    }
}

/// One entry of the audit trail
///
/// ERROR records always carry an `exception` key (`null` when there is no
/// detail); INFO records omit it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StepRecord {
    #[serde(rename = "t")]
    pub timestamp: String,
    pub level: Level,
    pub step: String,
    #[serde(rename = "msg")]
    pub message: String,
    /// File name inside the run directory
    pub screenshot: Option<String>,
    #[serde(default)]
    pub exception: Option<String>,
}

impl Serialize for StepRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let with_exception = self.level == Level::Error || self.exception.is_some();
        let len = if with_exception { 6 } else { 5 };

        let mut state = serializer.serialize_struct("StepRecord", len)?;
        state.serialize_field("t", &self.timestamp)?;
        state.serialize_field("level", &self.level)?;
        state.serialize_field("step", &self.step)?;
        state.serialize_field("msg", &self.message)?;
        state.serialize_field("screenshot", &self.screenshot)?;
        if with_exception {
            state.serialize_field("exception", &self.exception)?;
        } else {
            state.skip_field("exception")?;
        }
        state.end()
    }
}

/// The directory one run writes into
#[derive(Debug, Clone)]
pub struct RunDir {
    name: String,
    path: PathBuf,
}

impl RunDir {
    /// `<artifacts_dir>/<base>_<YYYY-mm-dd_HH-MM-SS>`, created if missing
    pub fn create(artifacts_dir: &Path, base: &str) -> HarnessResult<Self> {
        let name = format!("{}_{}", base, Local::now().format("%Y-%m-%d_%H-%M-%S"));
        Self::create_named(artifacts_dir, name)
    }

    pub fn create_named(artifacts_dir: &Path, name: impl Into<String>) -> HarnessResult<Self> {
        let name = name.into();
        let path = artifacts_dir.join(&name);
        fs::create_dir_all(&path)?;
        Ok(Self { name, path })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling of the run directory
    pub fn archive_path(&self) -> PathBuf {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        parent.join(format!("{}_artifacts.zip", self.name))
    }
}

/// Plain-text run log, open from run start until finalize
pub struct RunLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunLog {
    pub fn open(path: &Path) -> HarnessResult<Self> {
        let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines are flushed as written so a crash keeps everything logged so far.
    pub fn write_line(&mut self, level: Level, message: &str) {
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        let result = writeln!(self.writer, "{} | {} | {}", stamp, level.as_str(), message)
            .and_then(|_| self.writer.flush());
        if let Err(e) = result {
            error!("Could not write to {}: {}", self.path.display(), e);
        }
    }

    pub fn close(mut self) -> HarnessResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Records every step with a screenshot and seals the run into an archive.
pub struct Reporter {
    capture: Arc<dyn ScreenCapture>,
    run_dir: RunDir,
    log: Option<RunLog>,
    steps: Vec<StepRecord>,
    counter: u32,
    finalized: bool,
}

impl Reporter {
    pub fn new(capture: Arc<dyn ScreenCapture>, run_dir: RunDir, log: RunLog) -> Self {
        Self {
            capture,
            run_dir,
            log: Some(log),
            steps: Vec::new(),
            counter: 0,
            finalized: false,
        }
    }

    /// Create the run directory and its log, then the reporter over them
    pub fn start(capture: Arc<dyn ScreenCapture>, config: &ReportConfig) -> HarnessResult<Self> {
        let run_dir = RunDir::create(&config.artifacts_dir, &config.run_base)?;
        let log = RunLog::open(&run_dir.path().join(LOG_FILE))?;
        info!("Run artifacts: {}", run_dir.path().display());
        Ok(Self::new(capture, run_dir, log))
    }

    pub fn run_name(&self) -> &str {
        self.run_dir.name()
    }

    pub fn run_dir(&self) -> &Path {
        self.run_dir.path()
    }

    pub fn archive_path(&self) -> PathBuf {
        self.run_dir.archive_path()
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub async fn info(&mut self, step: &str, message: impl Into<String>) {
        let message = message.into();
        let screenshot = self.snap(step).await;
        info!("{} | {}", step, message);
        self.log_line(Level::Info, &format!("{} | {}", step, message));
        self.push(Level::Info, step, message, screenshot, None);
    }

    pub async fn error(&mut self, step: &str, message: impl Into<String>, exception: Option<&str>) {
        let message = message.into();
        let screenshot = self.snap(step).await;
        error!("{} | {}", step, message);
        self.log_line(Level::Error, &format!("{} | {}", step, message));
        if let Some(detail) = exception {
            error!("{}", detail);
            self.log_line(Level::Error, detail);
        }
        self.push(
            Level::Error,
            step,
            message,
            screenshot,
            exception.map(str::to_string),
        );
    }

    fn push(
        &mut self,
        level: Level,
        step: &str,
        message: String,
        screenshot: Option<String>,
        exception: Option<String>,
    ) {
        self.steps.push(StepRecord {
            timestamp: Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            level,
            step: step.to_string(),
            message,
            screenshot,
            exception,
        });
    }

    fn log_line(&mut self, level: Level, message: &str) {
        if let Some(log) = self.log.as_mut() {
            log.write_line(level, message);
        }
    }

    /// Capture the page; the counter advances even when capture fails.
    async fn snap(&mut self, step: &str) -> Option<String> {
        self.counter += 1;
        let file_name = format!("{:03}_{}.png", self.counter, sanitize_step_name(step));
        let path = self.run_dir.path().join(&file_name);

        let written: HarnessResult<()> = match self.capture.screenshot_png().await {
            Ok(png) => fs::write(&path, png).map_err(Into::into),
            Err(e) => Err(e),
        };

        match written {
            Ok(()) => Some(file_name),
            Err(e) => {
                error!("Screenshot failed: {}", e);
                self.log_line(Level::Error, &format!("Screenshot failed: {}", e));
                None
            }
        }
    }

    /// Write `report.json`, close `run.log` and zip the run directory.
    ///
    /// Only the first call does any work; later calls return the archive path.
    /// Every stage is attempted even if an earlier one fails, and the first
    /// failure is returned.
    pub fn finalize(&mut self) -> HarnessResult<PathBuf> {
        let archive = self.run_dir.archive_path();
        if self.finalized {
            return Ok(archive);
        }
        self.finalized = true;

        let report = self.write_report();
        if let Err(e) = &report {
            error!("Writing {} failed: {}", REPORT_FILE, e);
        }
        let closed = match self.log.take() {
            Some(log) => log.close(),
            None => Ok(()),
        };
        let archived = write_archive(self.run_dir.path(), &archive);

        report?;
        closed?;
        archived?;
        info!("Artifacts zipped: {}", archive.display());
        Ok(archive)
    }

    fn write_report(&self) -> HarnessResult<()> {
        let report = serde_json::to_string_pretty(&self.steps)?;
        fs::write(self.run_dir.path().join(REPORT_FILE), report)?;
        Ok(())
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if !self.finalized {
            if let Err(e) = self.finalize() {
                error!("Finalizing artifacts failed: {}", e);
            }
        }
    }
}

/// Zip every regular file directly inside `dir`, stored under its bare name.
fn write_archive(dir: &Path, archive: &Path) -> HarnessResult<()> {
    let opts = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(File::create(archive)?);

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let name = entry.file_name().to_string_lossy().to_string();
        zip.start_file(name, opts)?;
        zip.write_all(&fs::read(entry.path())?)?;
    }

    zip.finish()?;
    Ok(())
}
