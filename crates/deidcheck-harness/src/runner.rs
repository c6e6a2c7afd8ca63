//! Test-plan runner.
//!
//! Tests run strictly one after another. For each `[[tests]]` entry:
//!
//! ```text
//! snapshot output ─► dispatch stimulus ─► wait for success marker
//!                                                │
//!        TestResult ◄─ classify ◄─ snapshot output again
//! ```
//!
//! An `Error` outcome (environment problem) stops the run when
//! `abort_on_error` is set; tests that never ran are recorded as `Unknown`.

use crate::error::HarnessError;
use crate::service::{check_health, ServiceController, ServiceStatus};
use crate::stimulus::stimulus_from_config;
use deidcheck_core::config::{HarnessConfig, TestCase};
use deidcheck_core::snapshot::{delta, snapshot};
use deidcheck_core::{
    Evidence, JobOutcome, JobWaiter, LogMatcher, TestResult, VerificationEngine,
};
use std::time::Duration;
use tracing::{info, warn};

/// Everything a run produced, ready for aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub service_health: JobOutcome,
    pub service_details: String,
    pub results: Vec<TestResult>,
}

/// Drives the tests of one plan against one service.
pub struct Runner<'a> {
    config: &'a HarnessConfig,
    controller: &'a dyn ServiceController,
    engine: VerificationEngine,
}

impl<'a> Runner<'a> {
    pub fn new(config: &'a HarnessConfig, controller: &'a dyn ServiceController) -> Self {
        Self {
            config,
            controller,
            engine: VerificationEngine::new(config.harness.min_log_lines),
        }
    }

    /// Start the service if the plan manages it, then report its health.
    pub fn prepare_service(&self) -> Result<(JobOutcome, String), HarnessError> {
        let settings = &self.config.service;
        if settings.manage {
            self.controller.start()?;
            let running = self.controller.wait_for(
                ServiceStatus::Running,
                Duration::from_secs(settings.start_timeout_secs),
                Duration::from_secs(settings.poll_interval_secs),
            )?;
            if !running {
                return Err(HarnessError::ServiceTimeout {
                    name: self.controller.name().to_string(),
                    target: ServiceStatus::Running.to_string(),
                    timeout_secs: settings.start_timeout_secs,
                });
            }
        }
        Ok(check_health(self.controller))
    }

    /// Run every test in plan order.
    pub fn run(&self) -> Result<RunReport, HarnessError> {
        let (service_health, service_details) = self.prepare_service()?;
        info!(%service_health, %service_details, "service health");

        let mut results = Vec::with_capacity(self.config.tests.len());
        let mut tests = self.config.tests.iter();
        while let Some(test) = tests.next() {
            let result = self.run_test(test)?;
            let aborted = result.outcome == JobOutcome::Error && self.config.harness.abort_on_error;
            results.push(result);
            if aborted {
                warn!(test = %test.name, "environment error, skipping remaining tests");
                results.extend(tests.by_ref().map(|skipped| self.not_run(skipped, &test.name)));
            }
        }

        Ok(RunReport {
            service_health,
            service_details,
            results,
        })
    }

    /// Stimulate, wait, and verify a single test.
    ///
    /// Negative outcomes (timeouts, failures, missing artifacts) come back as
    /// a [`TestResult`]. Only an output directory that cannot be enumerated
    /// at all is raised.
    pub fn run_test(&self, test: &TestCase) -> Result<TestResult, HarnessError> {
        let harness = &self.config.harness;
        let job_type = self
            .config
            .job_type(&test.job_type)
            .ok_or_else(|| HarnessError::UnknownJobType(test.job_type.clone()))?;
        let patterns = job_type.patterns_for(&test.job_id)?;
        info!(test = %test.name, job_type = %test.job_type, job_id = %test.job_id, "running test");

        let before = test.output_dir.as_deref().map(snapshot).transpose()?;

        let stimulus = stimulus_from_config(&test.stimulus);
        let dispatched = match stimulus.dispatch() {
            Ok(record) => record,
            Err(err) => {
                warn!(test = %test.name, error = %err, "stimulus failed");
                return Ok(TestResult {
                    name: test.name.clone(),
                    outcome: JobOutcome::Error,
                    details: format!("stimulus {} failed: {err}", stimulus.describe()),
                    evidence: Evidence {
                        matched_line: None,
                        directory_delta: None,
                        log_path: harness.log_path.clone(),
                        total_lines_seen: 0,
                    },
                });
            }
        };

        let waiter = JobWaiter::new(test.timeout(harness), test.poll_interval(harness))
            .with_matcher(
                LogMatcher::new(patterns.scan_window).with_min_lines(harness.min_log_lines),
            );
        // Only a job-scoped failure line can end the wait early.
        let stop_on_failure = patterns
            .failure
            .as_ref()
            .filter(|_| job_type.failure_names_job());
        let waited =
            waiter.wait_for_completion(&harness.log_path, &patterns.success, stop_on_failure);
        match waited {
            Ok(outcome) => info!(
                test = %test.name,
                matched = outcome.matched,
                failed = outcome.failed,
                polls = outcome.polls,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "wait finished"
            ),
            // The engine re-reads the log and classifies this as Error.
            Err(err) => warn!(test = %test.name, error = %err, "wait aborted"),
        }

        let dir_delta = match (before, test.output_dir.as_deref()) {
            (Some(before), Some(dir)) => Some(delta(&before, &snapshot(dir)?)),
            _ => None,
        };

        let mut result = self
            .engine
            .verify(&test.name, &harness.log_path, &patterns, dir_delta);
        result.details.push_str(&format!(
            "; stimulus {} dispatched at {}",
            dispatched.description,
            dispatched.dispatched_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        if result.outcome.is_success() {
            info!(test = %result.name, outcome = %result.outcome, "verified");
        } else {
            warn!(test = %result.name, outcome = %result.outcome, details = %result.details, "verification did not succeed");
        }
        Ok(result)
    }

    fn not_run(&self, test: &TestCase, aborted_at: &str) -> TestResult {
        TestResult {
            name: test.name.clone(),
            outcome: JobOutcome::Unknown,
            details: format!("not run: aborted after environment error in {aborted_at:?}"),
            evidence: Evidence {
                matched_line: None,
                directory_delta: None,
                log_path: self.config.harness.log_path.clone(),
                total_lines_seen: 0,
            },
        }
    }
}
