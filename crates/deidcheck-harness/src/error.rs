//! Error types for deidcheck-harness.

use deidcheck_core::VerifyError;
use std::path::PathBuf;

/// Failures that stop the harness from driving or observing the service.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("failed to launch {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {code:?}: {output}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        output: String,
    },

    #[error("failed to copy {} to {}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("service {name} did not reach {target} within {timeout_secs}s")]
    ServiceTimeout {
        name: String,
        target: String,
        timeout_secs: u64,
    },

    #[error("unknown job type {0:?}")]
    UnknownJobType(String),

    #[error(transparent)]
    Verify(#[from] VerifyError),
}
