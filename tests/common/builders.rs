//! Ergonomic constructors for `TestResult` fixtures.
//!
//! These builders are designed for readability in test assertions, not for
//! production use.

use deidcheck_core::{DirectoryDelta, Evidence, JobOutcome, TestResult};
use std::path::PathBuf;

/// Fluent builder for [`TestResult`] fixtures.
///
/// ```rust
/// let result = TestResultBuilder::new("watch folder")
///     .outcome(JobOutcome::Warning)
///     .files_created(3)
///     .build();
/// ```
pub struct TestResultBuilder {
    name: String,
    outcome: JobOutcome,
    details: String,
    matched_line: Option<String>,
    directory_delta: Option<DirectoryDelta>,
    log_path: PathBuf,
    total_lines_seen: usize,
}

impl TestResultBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: JobOutcome::Success,
            details: String::new(),
            matched_line: None,
            directory_delta: None,
            log_path: PathBuf::from("DeIdentification.log"),
            total_lines_seen: 0,
        }
    }

    pub fn outcome(mut self, outcome: JobOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    pub fn matched_line(mut self, line: impl Into<String>) -> Self {
        self.matched_line = Some(line.into());
        self
    }

    pub fn files_created(mut self, n: i64) -> Self {
        self.directory_delta = Some(DirectoryDelta {
            directories_created: 0,
            files_created: n,
            bytes_increase: n * 1024,
        });
        self
    }

    pub fn lines_seen(mut self, n: usize) -> Self {
        self.total_lines_seen = n;
        self
    }

    pub fn build(self) -> TestResult {
        TestResult {
            name: self.name,
            outcome: self.outcome,
            details: self.details,
            evidence: Evidence {
                matched_line: self.matched_line,
                directory_delta: self.directory_delta,
                log_path: self.log_path,
                total_lines_seen: self.total_lines_seen,
            },
        }
    }
}

/// Build `n` results named `test-0 .. test-n` with the given outcome.
pub fn results_with(outcome: JobOutcome, n: usize) -> Vec<TestResult> {
    (0..n)
        .map(|i| TestResultBuilder::new(format!("test-{i}")).outcome(outcome).build())
        .collect()
}
