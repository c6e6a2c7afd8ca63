//! JSON results sink.
//!
//! A run is saved as a [`ResultsFile`] so the report can be regenerated, or
//! several runs compared, without re-running any test.

use crate::error::ReportError;
use chrono::{DateTime, Utc};
use deidcheck_core::aggregate::aggregate_at;
use deidcheck_core::{JobOutcome, ReportSummary, TestResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Raw evidence of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsFile {
    pub service_health: JobOutcome,
    #[serde(default)]
    pub service_details: String,
    pub results: Vec<TestResult>,
    pub recorded_at: DateTime<Utc>,
}

impl ResultsFile {
    pub fn new(service_health: JobOutcome, service_details: String, results: Vec<TestResult>) -> Self {
        Self {
            service_health,
            service_details,
            results,
            recorded_at: Utc::now(),
        }
    }

    /// Aggregate the saved results. Stamped with `recorded_at`, so repeated
    /// calls give the same summary.
    pub fn summary(&self) -> ReportSummary {
        aggregate_at(self.service_health, &self.results, self.recorded_at)
    }
}

pub fn write_results(path: &Path, results: &ResultsFile) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(results).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), tests = results.results.len(), "results written");
    Ok(())
}

pub fn read_results(path: &Path) -> Result<ResultsFile, ReportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use deidcheck_core::{DirectoryDelta, Evidence, OverallOutcome};
    use pretty_assertions::assert_eq;

    #[test]
    fn saved_results_regenerate_the_same_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let saved = ResultsFile::new(
            JobOutcome::Success,
            "service DeIdentificationService is RUNNING".to_string(),
            vec![TestResult {
                name: "watch folder".to_string(),
                outcome: JobOutcome::Warning,
                details: "output artifacts appeared but success pattern was not found".to_string(),
                evidence: Evidence {
                    matched_line: None,
                    directory_delta: Some(DirectoryDelta {
                        directories_created: 1,
                        files_created: 4,
                        bytes_increase: 2048,
                    }),
                    log_path: "C:/logs/deid.log".into(),
                    total_lines_seen: 12,
                },
            }],
        );
        write_results(&path, &saved).unwrap();

        let loaded = read_results(&path).unwrap();
        assert_eq!(loaded.summary(), saved.summary());
        assert_eq!(loaded.summary().overall_outcome, OverallOutcome::Warning);
    }

    #[test]
    fn garbage_is_a_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(read_results(&path), Err(ReportError::Json { .. })));
    }
}
