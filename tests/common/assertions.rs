//! Domain-specific assertion macros for deidcheck harnesses.
//!
//! These add context-rich failure messages that make it clear *which*
//! evidence the engine saw when it produced an unexpected verdict.

/// Assert that a `TestResult` has the expected outcome, printing its details
/// and evidence on failure.
///
/// ```rust
/// assert_outcome!(result, JobOutcome::Success);
/// ```
#[macro_export]
macro_rules! assert_outcome {
    ($result:expr, $outcome:expr) => {{
        let result: &deidcheck_core::TestResult = &$result;
        let expected: deidcheck_core::JobOutcome = $outcome;
        if result.outcome != expected {
            panic!(
                "assert_outcome! failed for {:?}:\n  expected: {:?}\n  actual:   {:?}\n  details:  {}\n  evidence: {:?}",
                result.name, expected, result.outcome, result.details, result.evidence
            );
        }
    }};
}

/// Assert that a `LogScan` found a match at the given 1-based line number.
///
/// ```rust
/// assert_found_at!(scan, 3);
/// ```
#[macro_export]
macro_rules! assert_found_at {
    ($scan:expr, $line:expr) => {{
        match &$scan {
            deidcheck_core::LogScan::Searched(result) if result.found => {
                assert_eq!(
                    result.line_number,
                    Some($line),
                    "assert_found_at! matched the wrong line: {:?}",
                    result.matched_line
                );
            }
            other => panic!("assert_found_at! failed: no match, scan was {:?}", other),
        }
    }};
}

/// Assert that a `LogScan` searched the log and found nothing.
#[macro_export]
macro_rules! assert_not_found {
    ($scan:expr) => {{
        match &$scan {
            deidcheck_core::LogScan::Searched(result) if !result.found => {}
            other => panic!("assert_not_found! failed: scan was {:?}", other),
        }
    }};
}
