//! deidcheck-harness — drives the DeIdentification service under test.
//!
//! This crate owns the parts of a run that touch the outside world: the
//! service controller, the stimulus producers that start jobs, and the
//! [`Runner`] that sequences stimulus, wait, and verification for every test
//! in a plan. The verdicts themselves come from [`deidcheck_core`].

pub mod error;
pub mod runner;
pub mod service;
pub mod stimulus;

pub use error::HarnessError;
pub use runner::{RunReport, Runner};
pub use service::{controller_from_settings, ServiceController, ServiceStatus};
pub use stimulus::{DispatchRecord, Stimulus};
