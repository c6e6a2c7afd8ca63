//! Error types for deidcheck-core.
//!
//! Only environment problems are errors. A job that has not (yet) logged its
//! completion is an ordinary [`JobOutcome`](crate::JobOutcome), never a
//! [`VerifyError`].

use std::path::PathBuf;

/// Hard failures raised by the verification components.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The log file exists but could not be read (permissions, disk error, …).
    #[error("failed to read log file {}", path.display())]
    LogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot root exists but could not be enumerated at all.
    #[error("failed to enumerate directory {}", path.display())]
    DirectoryScan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// A rendered pattern template is not a valid regular expression.
    #[error("invalid pattern {pattern:?}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
