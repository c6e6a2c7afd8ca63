//! deidcheck — end-to-end verification harness for a DeIdentification service.
//!
//! The harness drives the service through its input channels (watch-folder
//! drops, SOAP/REST calls, Part10 batches), watches the service log and
//! output directories for completion evidence, and renders a consolidated
//! report. This crate re-exports the workspace layers so that integration
//! tests can import them from one place.
//!
//! # Architecture
//!
//! ```text
//! harness (service, stimulus, runner)
//!    │
//!    ▼
//! core: snapshot + matcher ──► waiter ──► engine ──► aggregate
//!                                                       │
//!                                                       ▼
//!                                              report (HTML, JSON)
//! ```

pub use deidcheck_core::{aggregate, config, engine, matcher, snapshot, types, waiter};
pub use deidcheck_core::{
    JobOutcome, OverallOutcome, ReportSummary, TestResult, VerifyError,
};
pub use deidcheck_harness as harness;
pub use deidcheck_report as report;
