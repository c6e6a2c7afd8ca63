//! Verification engine — turns log evidence and a directory delta into a
//! [`JobOutcome`].
//!
//! Job types are data, not code: a [`JobType`] is a success template, an
//! optional failure template and a flag saying whether output artifacts are
//! required. Templates are rendered for a concrete job id with
//! [`JobType::patterns_for`].
//!
//! # Decision table
//!
//! Evaluated top to bottom, first matching rule wins:
//!
//! | # | Evidence                                              | Outcome      |
//! |---|-------------------------------------------------------|--------------|
//! | 1 | log unreadable                                        | `Error`      |
//! | 2 | log absent                                            | `NotFound`   |
//! | 3 | log shorter than the required line count              | `Incomplete` |
//! | 4 | success matched, artifacts present or not required    | `Success`    |
//! | 5 | success matched, required artifacts absent            | `Warning`    |
//! | 6 | artifacts present, success not matched                | `Warning`    |
//! | 7 | failure pattern matched                               | `Failed`     |
//! | 8 | anything else                                         | `InProgress` |

use crate::error::VerifyError;
use crate::matcher::{read_log_lines, LogMatcher, LogScan, Pattern};
use crate::types::{DirectoryDelta, Evidence, JobOutcome, LogMatchResult, ScanWindow, TestResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Placeholder substituted with the job id in pattern templates.
pub const JOB_ID_PLACEHOLDER: &str = "{job_id}";

// ---------------------------------------------------------------------------
// Job types
// ---------------------------------------------------------------------------

/// How a success template is matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    #[default]
    Literal,
    Regex,
}

/// Pattern templates for one kind of job (`[job_types.<name>]` in the plan).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobType {
    pub success_pattern: String,
    #[serde(default)]
    pub success_match: MatchKind,
    /// Always a regular expression, e.g. `failed [1-9]\d*`.
    #[serde(default)]
    pub failure_pattern: Option<String>,
    #[serde(default)]
    pub requires_directory_evidence: bool,
    #[serde(default)]
    pub scan_window: ScanWindow,
}

impl JobType {
    /// Render the templates for `job_id`. Inside regex templates the id is
    /// escaped, so ids never change the meaning of the expression.
    pub fn patterns_for(&self, job_id: &str) -> Result<JobPatterns, VerifyError> {
        let success = match self.success_match {
            MatchKind::Literal => {
                Pattern::contains(self.success_pattern.replace(JOB_ID_PLACEHOLDER, job_id))
            }
            MatchKind::Regex => Pattern::regex(&render_regex(&self.success_pattern, job_id))?,
        };
        let failure = self
            .failure_pattern
            .as_deref()
            .map(|template| Pattern::regex(&render_regex(template, job_id)))
            .transpose()?;

        Ok(JobPatterns {
            success,
            failure,
            requires_directory_evidence: self.requires_directory_evidence,
            scan_window: self.scan_window,
        })
    }

    /// Whether the failure template is tied to one job. A failure line from a
    /// job-agnostic template may belong to any earlier job in the log.
    pub fn failure_names_job(&self) -> bool {
        self.failure_pattern
            .as_deref()
            .is_some_and(|template| template.contains(JOB_ID_PLACEHOLDER))
    }
}

fn render_regex(template: &str, job_id: &str) -> String {
    template.replace(JOB_ID_PLACEHOLDER, &regex::escape(job_id))
}

/// A [`JobType`] rendered for one job id.
#[derive(Debug, Clone)]
pub struct JobPatterns {
    pub success: Pattern,
    pub failure: Option<Pattern>,
    pub requires_directory_evidence: bool,
    pub scan_window: ScanWindow,
}

// ---------------------------------------------------------------------------
// Evidence and classification
// ---------------------------------------------------------------------------

/// Everything read from the log for one verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvidence {
    /// The log exists but reading it failed. Holds the error text.
    Unreadable(String),
    Missing,
    Incomplete {
        lines_seen: usize,
        required: usize,
    },
    Searched {
        success: LogMatchResult,
        failure: Option<LogMatchResult>,
        total_lines: usize,
        last_line: Option<String>,
    },
}

impl LogEvidence {
    pub fn total_lines(&self) -> usize {
        match self {
            LogEvidence::Unreadable(_) | LogEvidence::Missing => 0,
            LogEvidence::Incomplete { lines_seen, .. } => *lines_seen,
            LogEvidence::Searched { total_lines, .. } => *total_lines,
        }
    }
}

/// An outcome plus the human-readable reason for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub outcome: JobOutcome,
    pub details: String,
}

impl Classification {
    fn new(outcome: JobOutcome, details: impl Into<String>) -> Self {
        Self {
            outcome,
            details: details.into(),
        }
    }
}

/// Apply the decision table. Pure: the same evidence always yields the same
/// classification.
pub fn classify(
    patterns: &JobPatterns,
    log_path: &Path,
    evidence: &LogEvidence,
    dir: Option<&DirectoryDelta>,
) -> Classification {
    let log = log_path.display();
    let (success, failure, last_line) = match evidence {
        LogEvidence::Unreadable(reason) => {
            return Classification::new(
                JobOutcome::Error,
                format!("log {log} could not be read: {reason}"),
            );
        }
        LogEvidence::Missing => {
            return Classification::new(JobOutcome::NotFound, format!("log {log} does not exist"));
        }
        LogEvidence::Incomplete {
            lines_seen,
            required,
        } => {
            return Classification::new(
                JobOutcome::Incomplete,
                format!(
                    "log {log} has {lines_seen} line(s), at least {required} needed before it can be searched"
                ),
            );
        }
        LogEvidence::Searched {
            success,
            failure,
            last_line,
            ..
        } => (success, failure.as_ref(), last_line.as_deref()),
    };

    let artifacts = dir.is_some_and(DirectoryDelta::is_positive);
    let dir_text = dir.map_or_else(|| "no directory snapshot".to_string(), ToString::to_string);

    if success.found {
        let at = success.line_number.unwrap_or_default();
        if !patterns.requires_directory_evidence || artifacts {
            let mut details = format!("success pattern {} matched at line {at}", patterns.success);
            if let Some(delta) = dir {
                details.push_str(&format!("; output {delta}"));
            }
            return Classification::new(JobOutcome::Success, details);
        }
        return Classification::new(
            JobOutcome::Warning,
            format!(
                "success pattern {} matched at line {at} but no output artifacts appeared ({dir_text})",
                patterns.success
            ),
        );
    }

    if artifacts {
        return Classification::new(
            JobOutcome::Warning,
            format!(
                "output artifacts appeared ({dir_text}) but success pattern {} was not found in {} of {log}",
                patterns.success, success.scan_window
            ),
        );
    }

    if let (Some(pattern), Some(hit)) = (patterns.failure.as_ref(), failure) {
        if hit.found {
            return Classification::new(
                JobOutcome::Failed,
                format!(
                    "failure pattern {pattern} matched at line {}: {}",
                    hit.line_number.unwrap_or_default(),
                    hit.matched_line.as_deref().unwrap_or_default()
                ),
            );
        }
    }

    Classification::new(
        JobOutcome::InProgress,
        format!(
            "success pattern {} not found in {} of {log} ({} line(s) searched, last line: {:?}; {dir_text})",
            patterns.success,
            success.scan_window,
            success.searched_line_count,
            last_line.unwrap_or_default()
        ),
    )
}

// ---------------------------------------------------------------------------
// VerificationEngine
// ---------------------------------------------------------------------------

/// Reads the log once and classifies a job against its rendered patterns.
#[derive(Debug, Clone, Copy)]
pub struct VerificationEngine {
    min_lines: usize,
}

impl Default for VerificationEngine {
    fn default() -> Self {
        Self::new(1)
    }
}

impl VerificationEngine {
    pub fn new(min_lines: usize) -> Self {
        Self { min_lines }
    }

    /// Read the log and search it with the job's success and failure patterns.
    pub fn gather(&self, log_path: &Path, patterns: &JobPatterns) -> LogEvidence {
        let lines = match read_log_lines(log_path) {
            Ok(Some(lines)) => lines,
            Ok(None) => return LogEvidence::Missing,
            Err(err) => {
                warn!(log = %log_path.display(), error = %err, "log unreadable");
                return LogEvidence::Unreadable(error_chain(&err));
            }
        };

        let matcher = LogMatcher::new(patterns.scan_window).with_min_lines(self.min_lines);
        let success = match matcher.search(&lines, &patterns.success) {
            LogScan::Searched(result) => result,
            LogScan::Incomplete {
                lines_seen,
                required,
            } => {
                return LogEvidence::Incomplete {
                    lines_seen,
                    required,
                }
            }
            LogScan::Missing => return LogEvidence::Missing,
        };
        let failure = patterns
            .failure
            .as_ref()
            .and_then(|pattern| match matcher.find_first(&lines, pattern) {
                LogScan::Searched(result) => Some(result),
                _ => None,
            });

        LogEvidence::Searched {
            success,
            failure,
            total_lines: lines.len(),
            last_line: lines.last().cloned(),
        }
    }

    /// Gather evidence and classify it into a [`TestResult`].
    pub fn verify(
        &self,
        name: &str,
        log_path: &Path,
        patterns: &JobPatterns,
        dir: Option<DirectoryDelta>,
    ) -> TestResult {
        let evidence = self.gather(log_path, patterns);
        let Classification { outcome, details } =
            classify(patterns, log_path, &evidence, dir.as_ref());
        debug!(test = name, %outcome, %details, "classified");

        let matched_line = match &evidence {
            LogEvidence::Searched {
                success, failure, ..
            } => success.matched_line.clone().or_else(|| {
                failure
                    .as_ref()
                    .filter(|_| outcome == JobOutcome::Failed)
                    .and_then(|f| f.matched_line.clone())
            }),
            _ => None,
        };

        TestResult {
            name: name.to_string(),
            outcome,
            details,
            evidence: Evidence {
                matched_line,
                directory_delta: dir,
                log_path: log_path.to_path_buf(),
                total_lines_seen: evidence.total_lines(),
            },
        }
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::path::PathBuf;

    fn sync_job() -> JobType {
        JobType {
            success_pattern: r"Job ID: {job_id},.*successful [1-9]\d*, failed 0, completionPercentage: 100%"
                .to_string(),
            success_match: MatchKind::Regex,
            failure_pattern: Some(r"Job ID: {job_id},.*failed [1-9]\d*".to_string()),
            requires_directory_evidence: true,
            scan_window: ScanWindow::FullFile,
        }
    }

    fn searched(success: bool, failure: bool) -> LogEvidence {
        let result = |found: bool| LogMatchResult {
            found,
            matched_line: found.then(|| "line".to_string()),
            line_number: found.then_some(1),
            searched_line_count: 1,
            scan_window: ScanWindow::FullFile,
        };
        LogEvidence::Searched {
            success: result(success),
            failure: Some(result(failure)),
            total_lines: 1,
            last_line: Some("line".to_string()),
        }
    }

    fn files(n: i64) -> DirectoryDelta {
        DirectoryDelta {
            directories_created: 0,
            files_created: n,
            bytes_increase: n * 100,
        }
    }

    #[rstest]
    #[case::unreadable(LogEvidence::Unreadable("denied".into()), Some(files(3)), JobOutcome::Error)]
    #[case::missing(LogEvidence::Missing, Some(files(3)), JobOutcome::NotFound)]
    #[case::incomplete(LogEvidence::Incomplete { lines_seen: 0, required: 1 }, Some(files(3)), JobOutcome::Incomplete)]
    #[case::success(searched(true, false), Some(files(3)), JobOutcome::Success)]
    #[case::success_no_artifacts(searched(true, false), Some(files(0)), JobOutcome::Warning)]
    #[case::success_no_snapshot(searched(true, false), None, JobOutcome::Warning)]
    #[case::artifacts_only(searched(false, false), Some(files(2)), JobOutcome::Warning)]
    #[case::artifacts_beat_failure(searched(false, true), Some(files(2)), JobOutcome::Warning)]
    #[case::failed(searched(false, true), Some(files(0)), JobOutcome::Failed)]
    #[case::in_progress(searched(false, false), Some(files(0)), JobOutcome::InProgress)]
    #[case::deleted_files(searched(false, false), Some(files(-4)), JobOutcome::InProgress)]
    fn decision_table(
        #[case] evidence: LogEvidence,
        #[case] dir: Option<DirectoryDelta>,
        #[case] expected: JobOutcome,
    ) {
        let patterns = sync_job().patterns_for("100").unwrap();
        let got = classify(&patterns, Path::new("service.log"), &evidence, dir.as_ref());
        assert_eq!(got.outcome, expected, "details: {}", got.details);
    }

    #[test]
    fn success_without_directory_requirement_ignores_artifacts() {
        let mut job = sync_job();
        job.requires_directory_evidence = false;
        let patterns = job.patterns_for("100").unwrap();
        let got = classify(&patterns, Path::new("service.log"), &searched(true, false), None);
        assert_eq!(got.outcome, JobOutcome::Success);
    }

    #[test]
    fn job_id_is_escaped_in_regex_templates() {
        let patterns = sync_job().patterns_for("1.0").unwrap();
        assert!(!patterns.success.is_match(
            "Job ID: 120, Status callback: , successful 1, failed 0, completionPercentage: 100%"
        ));
        assert!(patterns.success.is_match(
            "Job ID: 1.0, Status callback: , successful 1, failed 0, completionPercentage: 100%"
        ));
    }

    #[test]
    fn literal_template_substitutes_job_id() {
        let job = JobType {
            success_pattern: "for jobID {job_id} took".to_string(),
            success_match: MatchKind::Literal,
            failure_pattern: None,
            requires_directory_evidence: false,
            scan_window: ScanWindow::TailN(1),
        };
        let patterns = job.patterns_for("42").unwrap();
        assert_eq!(patterns.success.as_str(), "for jobID 42 took");
        assert!(patterns.failure.is_none());
    }

    #[test]
    fn failure_names_job_only_with_placeholder() {
        assert!(sync_job().failure_names_job());

        let mut agnostic = sync_job();
        agnostic.failure_pattern = Some(r"failed [1-9]\d*".to_string());
        assert!(!agnostic.failure_names_job());

        agnostic.failure_pattern = None;
        assert!(!agnostic.failure_names_job());
    }

    #[test]
    fn verify_reports_failure_line_as_evidence() {
        let dir = tempfile::tempdir().unwrap();
        let log: PathBuf = dir.path().join("service.log");
        std::fs::write(
            &log,
            "Job ID: 100, Status callback: , successful 0, failed 1, completionPercentage: 100%\n",
        )
        .unwrap();

        let patterns = sync_job().patterns_for("100").unwrap();
        let result = VerificationEngine::default().verify("sync", &log, &patterns, Some(files(0)));
        assert_eq!(result.outcome, JobOutcome::Failed);
        assert_eq!(result.evidence.total_lines_seen, 1);
        assert!(result
            .evidence
            .matched_line
            .as_deref()
            .is_some_and(|l| l.contains("failed 1")));
    }

    #[test]
    fn in_progress_details_name_pattern_and_path() {
        let patterns = sync_job().patterns_for("100").unwrap();
        let got = classify(
            &patterns,
            Path::new("C:/logs/deid.log"),
            &searched(false, false),
            None,
        );
        assert_eq!(got.outcome, JobOutcome::InProgress);
        assert!(got.details.contains("C:/logs/deid.log"));
        assert!(got.details.contains("Job ID: 100"));
    }
}
