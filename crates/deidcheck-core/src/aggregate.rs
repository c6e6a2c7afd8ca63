//! Result aggregation. Folds the service health check and every per-test
//! outcome into one [`ReportSummary`].
//!
//! The service health outcome counts as an input like any test: it takes part
//! in the verdict, the counts and the success rate. Aggregation is a pure
//! fold, so a report can be regenerated from saved results at any time.

use crate::types::{JobOutcome, OutcomeCounts, OverallOutcome, ReportSummary, TestResult};
use chrono::{DateTime, Utc};

/// Aggregate, stamping the summary with the current time.
pub fn aggregate(service_health: JobOutcome, tests: &[TestResult]) -> ReportSummary {
    aggregate_at(service_health, tests, Utc::now())
}

/// Aggregate with an explicit timestamp. Identical inputs give identical output.
pub fn aggregate_at(
    service_health: JobOutcome,
    tests: &[TestResult],
    generated_at: DateTime<Utc>,
) -> ReportSummary {
    let outcomes = || std::iter::once(service_health).chain(tests.iter().map(|t| t.outcome));
    let counts = outcomes().fold(OutcomeCounts::default(), |mut acc, outcome| {
        acc.total += 1;
        match outcome {
            JobOutcome::Success => acc.success += 1,
            JobOutcome::Failed => acc.failed += 1,
            _ => acc.partial += 1,
        }
        acc
    });

    ReportSummary {
        service_health,
        per_test: tests.to_vec(),
        overall_outcome: overall_outcome(outcomes()),
        success_rate_percent: success_rate_percent(counts.success, counts.total),
        counts,
        generated_at,
    }
}

/// `Passed` iff every outcome is a success, `Failed` iff any outcome failed,
/// `Warning` otherwise. An empty input passes vacuously.
pub fn overall_outcome(outcomes: impl IntoIterator<Item = JobOutcome>) -> OverallOutcome {
    let mut all_success = true;
    for outcome in outcomes {
        match outcome {
            JobOutcome::Failed => return OverallOutcome::Failed,
            JobOutcome::Success => {}
            _ => all_success = false,
        }
    }
    if all_success {
        OverallOutcome::Passed
    } else {
        OverallOutcome::Warning
    }
}

/// `100 * successes / total` rounded half up (82.5 → 83, 16.5 → 17).
/// Zero inputs give 0.
pub fn success_rate_percent(successes: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let successes = successes.min(total) as u128;
    let total = total as u128;
    // (100s / t) + 0.5, floored, in integer arithmetic.
    let rounded = (200 * successes + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

/// Process exit code for a summary: 0 only when the run passed.
pub fn exit_code(summary: &ReportSummary) -> i32 {
    match summary.overall_outcome {
        OverallOutcome::Passed => 0,
        OverallOutcome::Failed | OverallOutcome::Warning => 1,
    }
}
