//! Job waiter: blocks until a job marker shows up in the log or a deadline
//! passes.
//!
//! Each poll re-reads the whole log from scratch. There is no saved offset:
//! the log is append-only, so every re-read is a superset of the previous one
//! and a match, once seen, is seen on every later poll too.
//!
//! A timeout is an expected outcome and returns `false`. A log file that does
//! not exist yet is "not found so far" and polling continues. Only a log that
//! exists but cannot be read is an error.
//!
//! [`JobWaiter::wait_for_completion`] also stops early when a failure pattern
//! shows up, so a job that logged its own failure does not hold the run until
//! the deadline.

use crate::error::VerifyError;
use crate::matcher::{read_log_lines, LogMatcher, LogScan, Pattern};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// What a completed wait observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome {
    pub matched: bool,
    /// The failure pattern matched before the success pattern did.
    pub failed: bool,
    pub polls: u32,
    pub elapsed: Duration,
    /// Result of the final poll.
    pub last_scan: LogScan,
}

/// Polls a log file with a [`LogMatcher`] until a pattern matches or the
/// timeout elapses.
#[derive(Debug, Clone, Copy)]
pub struct JobWaiter {
    timeout: Duration,
    poll_interval: Duration,
    matcher: LogMatcher,
}

impl JobWaiter {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
            matcher: LogMatcher::default(),
        }
    }

    pub fn with_matcher(mut self, matcher: LogMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Poll until `pattern` matches or the timeout is reached.
    ///
    /// The log is checked once immediately, then after every sleep. The last
    /// sleep is shortened so the call returns close to the deadline.
    pub fn wait_for(&self, log_path: &Path, pattern: &Pattern) -> Result<WaitOutcome, VerifyError> {
        self.wait_for_completion(log_path, pattern, None)
    }

    /// Like [`wait_for`](Self::wait_for), but also returns as soon as
    /// `failure` matches. Success wins when both are present in the same read.
    pub fn wait_for_completion(
        &self,
        log_path: &Path,
        success: &Pattern,
        failure: Option<&Pattern>,
    ) -> Result<WaitOutcome, VerifyError> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut polls = 0u32;

        loop {
            polls += 1;
            let (scan, failed) = match read_log_lines(log_path)? {
                Some(lines) => {
                    let scan = self.matcher.search(&lines, success);
                    let failed = !scan.is_found()
                        && failure.is_some_and(|f| self.matcher.find_first(&lines, f).is_found());
                    (scan, failed)
                }
                None => (LogScan::Missing, false),
            };
            debug!(
                log = %log_path.display(),
                pattern = %success,
                poll = polls,
                ?scan,
                failed,
                "polled log"
            );

            if scan.is_found() || failed {
                info!(log = %log_path.display(), pattern = %success, polls, failed, "job finished");
                return Ok(WaitOutcome {
                    matched: !failed,
                    failed,
                    polls,
                    elapsed: started.elapsed(),
                    last_scan: scan,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                info!(
                    log = %log_path.display(),
                    pattern = %success,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "timed out waiting for pattern"
                );
                return Ok(WaitOutcome {
                    matched: false,
                    failed: false,
                    polls,
                    elapsed: started.elapsed(),
                    last_scan: scan,
                });
            }

            std::thread::sleep(self.poll_interval.min(deadline - now));
        }
    }

    /// [`wait_for`](Self::wait_for), reduced to whether the pattern appeared.
    pub fn await_pattern(&self, log_path: &Path, pattern: &Pattern) -> Result<bool, VerifyError> {
        self.wait_for(log_path, pattern).map(|outcome| outcome.matched)
    }
}

/// Wait up to `timeout_secs` for `pattern` to appear in the log at
/// `log_path`, re-reading it every `poll_interval_secs`.
pub fn await_pattern(
    log_path: &Path,
    pattern: &Pattern,
    timeout_secs: u64,
    poll_interval_secs: u64,
) -> Result<bool, VerifyError> {
    JobWaiter::new(
        Duration::from_secs(timeout_secs),
        Duration::from_secs(poll_interval_secs),
    )
    .await_pattern(log_path, pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn fast_waiter(timeout_ms: u64) -> JobWaiter {
        JobWaiter::new(Duration::from_millis(timeout_ms), Duration::from_millis(10))
    }

    #[test]
    fn returns_immediately_when_already_logged() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("service.log");
        std::fs::write(&log, "for jobID 3 took 10 ms\n").unwrap();

        let outcome = fast_waiter(5_000)
            .wait_for(&log, &Pattern::contains("for jobID 3 took"))
            .unwrap();
        assert!(outcome.matched);
        assert_eq!(outcome.polls, 1);
    }

    #[test]
    fn missing_log_times_out_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = fast_waiter(50)
            .wait_for(&dir.path().join("absent.log"), &Pattern::contains("x"))
            .unwrap();
        assert!(!outcome.matched);
        assert!(outcome.polls >= 2);
        assert_eq!(outcome.last_scan, LogScan::Missing);
    }

    #[test]
    fn sees_line_appended_while_polling() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("service.log");
        std::fs::write(&log, "service started\n").unwrap();

        let writer_log = log.clone();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&writer_log)
                .unwrap();
            writeln!(file, "for jobID 12 took 900 ms").unwrap();
        });

        let matched = fast_waiter(5_000)
            .await_pattern(&log, &Pattern::contains("for jobID 12 took"))
            .unwrap();
        writer.join().unwrap();
        assert!(matched);
    }

    #[test]
    fn failure_line_ends_the_wait_early() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("service.log");
        std::fs::write(
            &log,
            "Job ID: 8, Status callback: , successful 0, failed 1, completionPercentage: 100%\n",
        )
        .unwrap();

        let outcome = fast_waiter(60_000)
            .wait_for_completion(
                &log,
                &Pattern::regex(r"Job ID: 8,.*failed 0").unwrap(),
                Some(&Pattern::regex(r"Job ID: 8,.*failed [1-9]").unwrap()),
            )
            .unwrap();
        assert!(outcome.failed);
        assert!(!outcome.matched);
        assert_eq!(outcome.polls, 1);
        assert!(outcome.elapsed < Duration::from_secs(5));
    }

    #[test]
    fn success_wins_over_an_earlier_failure() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("service.log");
        std::fs::write(&log, "job 8 retrying after error\njob 8 done\n").unwrap();

        let outcome = fast_waiter(60_000)
            .wait_for_completion(
                &log,
                &Pattern::contains("job 8 done"),
                Some(&Pattern::contains("job 8 retrying")),
            )
            .unwrap();
        assert!(outcome.matched);
        assert!(!outcome.failed);
    }
}
