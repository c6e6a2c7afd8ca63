//! Test plan configuration for deidcheck.
//!
//! [`HarnessConfig::load`] layers, lowest priority first:
//!
//! 1. the built-in defaults below (including the stock job types),
//! 2. the TOML test plan given on the command line,
//! 3. `DEIDCHECK__<SECTION>__<KEY>` environment variables.
//!
//! [`HarnessConfig::defaults`] returns the built-in layer alone without
//! touching the filesystem (useful in tests). Every component receives the
//! pieces of this struct it needs; nothing reads ambient process state.

use crate::engine::JobType;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[harness]
log_path                   = 'C:\ProgramData\DeIdentification\Logs\DeIdentification.log'
default_timeout_secs       = 300
default_poll_interval_secs = 5
min_log_lines              = 1
abort_on_error             = true
results_json               = "deidcheck-results.json"
report_html                = "deidcheck-report.html"

[service]
name               = "DeIdentificationService"
controller         = "none"
manage             = false
start_timeout_secs = 120
poll_interval_secs = 2

[job_types.sync]
success_pattern             = 'Job ID: {job_id},.*successful [1-9]\d*, failed 0, completionPercentage: 100%'
success_match               = "regex"
failure_pattern             = 'Job ID: {job_id},.*failed [1-9]\d*'
requires_directory_evidence = false
scan_window                 = "full"

# Watch-folder completions carry no job id, so any earlier completion in the
# log (a sync job, say) also satisfies this type. Truncate the log before a
# watch-folder test, or run it first.
[job_types.watch_folder]
success_pattern             = 'successful [1-9]\d*, failed 0, completionPercentage: 100%'
success_match               = "regex"
failure_pattern             = 'failed [1-9]\d*'
requires_directory_evidence = true
scan_window                 = "full"

[job_types.part10]
success_pattern             = 'Job ID: {job_id},.*successful [1-9]\d*, failed 0, completionPercentage: 100%'
success_match               = "regex"
failure_pattern             = 'Job ID: {job_id},.*failed [1-9]\d*'
requires_directory_evidence = true
scan_window                 = "full"

[job_types.block_list]
success_pattern             = "for jobID {job_id} took"
success_match               = "literal"
requires_directory_evidence = false
scan_window                 = { tail = 2 }
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// A complete test plan.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub harness: HarnessSettings,
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub job_types: BTreeMap<String, JobType>,
    #[serde(default)]
    pub tests: Vec<TestCase>,
}

/// `[harness]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessSettings {
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub default_poll_interval_secs: u64,
    #[serde(default = "default_min_log_lines")]
    pub min_log_lines: usize,
    #[serde(default = "default_abort_on_error")]
    pub abort_on_error: bool,
    #[serde(default = "default_results_json")]
    pub results_json: PathBuf,
    #[serde(default = "default_report_html")]
    pub report_html: PathBuf,
}

fn default_log_path() -> PathBuf { PathBuf::from(r"C:\ProgramData\DeIdentification\Logs\DeIdentification.log") }
fn default_timeout_secs() -> u64 { 300 }
fn default_poll_interval_secs() -> u64 { 5 }
fn default_min_log_lines() -> usize { 1 }
fn default_abort_on_error() -> bool { true }
fn default_results_json() -> PathBuf { PathBuf::from("deidcheck-results.json") }
fn default_report_html() -> PathBuf { PathBuf::from("deidcheck-report.html") }

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            default_timeout_secs: default_timeout_secs(),
            default_poll_interval_secs: default_poll_interval_secs(),
            min_log_lines: default_min_log_lines(),
            abort_on_error: default_abort_on_error(),
            results_json: default_results_json(),
            report_html: default_report_html(),
        }
    }
}

/// Which service controller backs the `[service]` section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// Windows service control manager via `sc.exe`.
    Sc,
    /// The service is managed out of band; its health is reported as unknown.
    #[default]
    None,
}

/// `[service]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default)]
    pub controller: ControllerKind,
    /// Start the service (and wait for it) before running tests.
    #[serde(default)]
    pub manage: bool,
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: u64,
    #[serde(default = "default_service_poll_secs")]
    pub poll_interval_secs: u64,
}

fn default_service_name() -> String { "DeIdentificationService".to_string() }
fn default_start_timeout_secs() -> u64 { 120 }
fn default_service_poll_secs() -> u64 { 2 }

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            controller: ControllerKind::default(),
            manage: false,
            start_timeout_secs: default_start_timeout_secs(),
            poll_interval_secs: default_service_poll_secs(),
        }
    }
}

/// One `[[tests]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub job_type: String,
    /// Substituted for `{job_id}` in the job type's templates.
    #[serde(default)]
    pub job_id: String,
    /// Output directory (the DIR_OPTION folder) snapshotted around the stimulus.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
    #[serde(default)]
    pub stimulus: StimulusConfig,
}

impl TestCase {
    pub fn timeout(&self, harness: &HarnessSettings) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(harness.default_timeout_secs))
    }

    pub fn poll_interval(&self, harness: &HarnessSettings) -> Duration {
        Duration::from_secs(
            self.poll_interval_secs
                .unwrap_or(harness.default_poll_interval_secs),
        )
    }
}

/// How a test triggers the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StimulusConfig {
    /// Triggered out of band; the runner only waits and verifies.
    #[default]
    None,
    /// Copy a file into the watch folder.
    Copy {
        source: PathBuf,
        destination: PathBuf,
    },
    /// Run an external client (SOAP/REST/Part10 script, curl, …).
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl HarnessConfig {
    /// Load the plan at `path` on top of the built-in defaults, then apply
    /// `DEIDCHECK__` environment overrides.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("DEIDCHECK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("loading test plan {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("parsing test plan {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a plan from a TOML string on top of the built-in defaults.
    pub fn from_toml_str(plan: &str) -> anyhow::Result<Self> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from_str(plan, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    pub fn job_type(&self, name: &str) -> Option<&JobType> {
        self.job_types.get(name)
    }

    /// Every test must name a known job type whose templates render.
    pub fn validate(&self) -> anyhow::Result<()> {
        for test in &self.tests {
            let job_type = self.job_type(&test.job_type).with_context(|| {
                format!(
                    "test {:?} uses unknown job type {:?} (known: {})",
                    test.name,
                    test.job_type,
                    self.job_types.keys().cloned().collect::<Vec<_>>().join(", ")
                )
            })?;
            job_type
                .patterns_for(&test.job_id)
                .with_context(|| format!("test {:?} has an invalid pattern", test.name))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
