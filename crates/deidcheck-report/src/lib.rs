//! deidcheck-report — presentation layer for deidcheck.
//!
//! Renders a [`ReportSummary`](deidcheck_core::ReportSummary) as a single
//! HTML page and persists raw run results as JSON so reports can be rebuilt
//! later.

pub mod error;
pub mod html;
pub mod results;

pub use error::ReportError;
pub use html::render_html;
pub use results::{read_results, write_results, ResultsFile};

use std::path::Path;

/// Render `results` and write the page to `path`.
pub fn write_html_report(path: &Path, results: &ResultsFile) -> Result<(), ReportError> {
    let html = render_html(&results.summary(), &results.service_details);
    std::fs::write(path, html).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}
