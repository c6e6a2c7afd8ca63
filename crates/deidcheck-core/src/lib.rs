//! deidcheck-core — verification engine for the DeIdentification service
//! end-to-end harness.
//!
//! This crate decides, from an append-only service log and from directory
//! snapshots taken around an action, whether an asynchronous job succeeded.
//!
//! # Architecture
//!
//! ```text
//! snapshot ─────────────┐
//!                       ├──► engine ──► aggregate ──► report
//! matcher ──► waiter ───┘
//! ```
//!
//! Every stage produces immutable value records for the next. Execution is
//! single-threaded and blocking; the only concurrency is the external service
//! writing to the log and output tree while this crate reads them.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod snapshot;
pub mod types;
pub mod waiter;

pub use engine::{JobPatterns, JobType, VerificationEngine};
pub use error::VerifyError;
pub use matcher::{LogMatcher, LogScan, Pattern};
pub use types::{
    DirectoryDelta, DirectoryStats, Evidence, JobOutcome, LogMatchResult, OverallOutcome,
    ReportSummary, ScanWindow, TestResult,
};
pub use waiter::JobWaiter;
