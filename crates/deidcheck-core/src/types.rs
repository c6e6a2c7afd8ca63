//! Core types for deidcheck-core.
//!
//! This module defines the value records passed between the verification
//! stages: the [`JobOutcome`] taxonomy, directory statistics and deltas, log
//! match results, per-test [`TestResult`]s and the final [`ReportSummary`].
//! Every record is immutable once built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Classification of a single verification. Exactly one per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Success,
    Failed,
    Warning,
    InProgress,
    NotFound,
    Incomplete,
    Error,
    Unknown,
}

impl JobOutcome {
    pub fn is_success(self) -> bool {
        self == JobOutcome::Success
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Success => write!(f, "SUCCESS"),
            JobOutcome::Failed => write!(f, "FAILED"),
            JobOutcome::Warning => write!(f, "WARNING"),
            JobOutcome::InProgress => write!(f, "IN PROGRESS"),
            JobOutcome::NotFound => write!(f, "NOT FOUND"),
            JobOutcome::Incomplete => write!(f, "INCOMPLETE"),
            JobOutcome::Error => write!(f, "ERROR"),
            JobOutcome::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Point-in-time counts for a directory tree. The root itself is not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryStats {
    pub directory_count: u64,
    pub file_count: u64,
    pub total_bytes: u64,
}

/// Signed difference between two [`DirectoryStats`].
///
/// Negative values mean entries disappeared between the two snapshots (the
/// service deleted something concurrently). They are reported as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryDelta {
    pub directories_created: i64,
    pub files_created: i64,
    pub bytes_increase: i64,
}

impl DirectoryDelta {
    /// Directory evidence counts as positive when at least one file appeared.
    pub fn is_positive(&self) -> bool {
        self.files_created > 0
    }
}

impl std::fmt::Display for DirectoryDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:+} dirs, {:+} files, {:+} bytes",
            self.directories_created, self.files_created, self.bytes_increase
        )
    }
}

/// Which part of the log a matcher looks at.
///
/// `TailN(n)` is the "last line(s)" mode: it only holds up when the job under
/// test is guaranteed to be the most recent writer. Use `FullFile` whenever
/// job log lines can interleave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanWindow {
    #[default]
    #[serde(rename = "full")]
    FullFile,
    #[serde(rename = "tail")]
    TailN(usize),
}

impl std::fmt::Display for ScanWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanWindow::FullFile => write!(f, "full file"),
            ScanWindow::TailN(n) => write!(f, "last {n} line(s)"),
        }
    }
}

/// Result of searching one window of log lines. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMatchResult {
    pub found: bool,
    pub matched_line: Option<String>,
    /// 1-based line number of `matched_line` within the whole log.
    pub line_number: Option<usize>,
    pub searched_line_count: usize,
    pub scan_window: ScanWindow,
}

/// Evidence backing a [`TestResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub matched_line: Option<String>,
    pub directory_delta: Option<DirectoryDelta>,
    pub log_path: PathBuf,
    pub total_lines_seen: usize,
}

/// Outcome of one test, created once and consumed by the aggregator and the
/// report sinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub outcome: JobOutcome,
    pub details: String,
    pub evidence: Evidence,
}

/// Overall verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallOutcome {
    Passed,
    Failed,
    Warning,
}

impl std::fmt::Display for OverallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallOutcome::Passed => write!(f, "PASSED"),
            OverallOutcome::Failed => write!(f, "FAILED"),
            OverallOutcome::Warning => write!(f, "WARNING"),
        }
    }
}

/// Per-outcome tallies over every aggregated input (service health included).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// Everything that is neither a success nor a failure.
    pub partial: usize,
}

/// Final report payload. Built once at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub service_health: JobOutcome,
    pub per_test: Vec<TestResult>,
    pub overall_outcome: OverallOutcome,
    pub success_rate_percent: u8,
    pub counts: OutcomeCounts,
    pub generated_at: DateTime<Utc>,
}
