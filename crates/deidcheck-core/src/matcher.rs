//! Log matcher — searches the lines of a service log for a job marker.
//!
//! Two matching modes are supported:
//!
//! - [`Pattern::Contains`]: case-sensitive substring test.
//! - [`Pattern::Regex`]: regular expression over each line.
//!
//! and two windows (see [`ScanWindow`]):
//!
//! - `FullFile`: the whole log, **first match wins**. A log may hold several
//!   completions; the earliest one is stable as the log grows.
//! - `TailN(n)`: only the last `n` lines. This "last line" mode assumes the
//!   job under test is the most recent writer and breaks as soon as another
//!   job logs after it. Only use it for serialized, single-job tests.
//!
//! A missing log file ([`LogScan::Missing`]) and a log that is too short to
//! search ([`LogScan::Incomplete`]) are distinct from a completed search that
//! found nothing.

use crate::error::VerifyError;
use crate::types::{LogMatchResult, ScanWindow};
use regex::Regex;
use std::path::Path;

// ---------------------------------------------------------------------------
// Pattern
// ---------------------------------------------------------------------------

/// A line predicate.
#[derive(Debug, Clone)]
pub enum Pattern {
    Contains(String),
    Regex(Regex),
}

impl Pattern {
    pub fn contains(needle: impl Into<String>) -> Self {
        Pattern::Contains(needle.into())
    }

    pub fn regex(pattern: &str) -> Result<Self, VerifyError> {
        Regex::new(pattern)
            .map(Pattern::Regex)
            .map_err(|source| VerifyError::Pattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Pattern::Contains(needle) => line.contains(needle.as_str()),
            Pattern::Regex(re) => re.is_match(line),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Contains(needle) => needle,
            Pattern::Regex(re) => re.as_str(),
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Contains(needle) => write!(f, "{needle:?}"),
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Scan results
// ---------------------------------------------------------------------------

/// What a single look at the log produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogScan {
    /// The log file does not exist.
    Missing,
    /// The log exists but holds fewer lines than the scan requires.
    Incomplete { lines_seen: usize, required: usize },
    /// The window was searched. `found` tells whether the pattern was there.
    Searched(LogMatchResult),
}

impl LogScan {
    pub fn is_found(&self) -> bool {
        matches!(self, LogScan::Searched(result) if result.found)
    }

    pub fn matched_line(&self) -> Option<&str> {
        match self {
            LogScan::Searched(result) => result.matched_line.as_deref(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read every line of the log at `path` from scratch.
///
/// Returns `Ok(None)` when the file does not exist. Bytes that are not valid
/// UTF-8 (ANSI code-page output) are replaced rather than rejected, and a
/// half-written trailing line is returned as-is; it simply will not match.
pub fn read_log_lines(path: &Path) -> Result<Option<Vec<String>>, VerifyError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_string)
                .collect(),
        )),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(VerifyError::LogRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ---------------------------------------------------------------------------
// LogMatcher
// ---------------------------------------------------------------------------

/// Searches a window of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogMatcher {
    window: ScanWindow,
    min_lines: usize,
}

impl Default for LogMatcher {
    fn default() -> Self {
        Self::new(ScanWindow::FullFile)
    }
}

impl LogMatcher {
    pub fn new(window: ScanWindow) -> Self {
        Self {
            window,
            min_lines: 1,
        }
    }

    /// Treat logs shorter than `min_lines` as [`LogScan::Incomplete`]. A value
    /// below 1 is raised to 1: an empty log is never "searched".
    pub fn with_min_lines(mut self, min_lines: usize) -> Self {
        self.min_lines = min_lines;
        self
    }

    pub fn window(&self) -> ScanWindow {
        self.window
    }

    /// Lines the log must hold before it is worth searching.
    pub fn required_lines(&self) -> usize {
        let window = match self.window {
            ScanWindow::FullFile => 1,
            ScanWindow::TailN(n) => n,
        };
        window.max(self.min_lines).max(1)
    }

    /// First line in file order, within the window, matching `pattern`.
    pub fn find_first<S: AsRef<str>>(&self, lines: &[S], pattern: &Pattern) -> LogScan {
        let (offset, window) = match self.windowed(lines) {
            Ok(w) => w,
            Err(incomplete) => return incomplete,
        };
        let hit = window
            .iter()
            .enumerate()
            .find(|(_, line)| pattern.is_match(line.as_ref()));
        LogScan::Searched(self.result(hit, offset, window.len()))
    }

    /// Last line within the window containing `needle` (case-sensitive).
    pub fn find_last<S: AsRef<str>>(&self, lines: &[S], needle: &str) -> LogScan {
        let (offset, window) = match self.windowed(lines) {
            Ok(w) => w,
            Err(incomplete) => return incomplete,
        };
        let hit = window
            .iter()
            .enumerate()
            .rev()
            .find(|(_, line)| line.as_ref().contains(needle));
        LogScan::Searched(self.result(hit, offset, window.len()))
    }

    /// Search with the mode that fits the window: substring patterns over a
    /// tail use last-line mode, everything else uses first-match.
    pub fn search<S: AsRef<str>>(&self, lines: &[S], pattern: &Pattern) -> LogScan {
        match (self.window, pattern) {
            (ScanWindow::TailN(_), Pattern::Contains(needle)) => self.find_last(lines, needle),
            _ => self.find_first(lines, pattern),
        }
    }

    /// Re-read the log at `path` and [`search`](Self::search) it.
    pub fn scan_file(&self, path: &Path, pattern: &Pattern) -> Result<LogScan, VerifyError> {
        Ok(match read_log_lines(path)? {
            Some(lines) => self.search(&lines, pattern),
            None => LogScan::Missing,
        })
    }

    fn windowed<'a, S>(&self, lines: &'a [S]) -> Result<(usize, &'a [S]), LogScan> {
        let required = self.required_lines();
        if lines.len() < required {
            return Err(LogScan::Incomplete {
                lines_seen: lines.len(),
                required,
            });
        }
        let offset = match self.window {
            ScanWindow::FullFile => 0,
            ScanWindow::TailN(n) => lines.len() - n.max(1).min(lines.len()),
        };
        Ok((offset, &lines[offset..]))
    }

    fn result<S: AsRef<str>>(
        &self,
        hit: Option<(usize, &S)>,
        offset: usize,
        searched: usize,
    ) -> LogMatchResult {
        LogMatchResult {
            found: hit.is_some(),
            matched_line: hit.map(|(_, line)| line.as_ref().to_string()),
            line_number: hit.map(|(idx, _)| offset + idx + 1),
            searched_line_count: searched,
            scan_window: self.window,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
