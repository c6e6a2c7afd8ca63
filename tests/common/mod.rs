//! Shared test utilities for deidcheck integration harnesses.
//!
//! Import everything you need via `mod common; use common::*;` at the top of
//! each harness file. Helpers favour real temp files over mocks: the engine
//! under test is all about observing a filesystem someone else writes to.

pub mod assertions;
pub mod builders;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
