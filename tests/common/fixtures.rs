//! Log corpora and on-disk fixtures used across harnesses.

use std::io::Write;
use std::path::{Path, PathBuf};

/// The completion line a synchronous REST job writes on success.
pub const SYNC_SUCCESS_100: &str =
    "Job ID: 100, Status callback: , successful 1, failed 0, completionPercentage: 100%";

/// The completion line of a synchronous job that failed one item.
pub const SYNC_FAILED_100: &str =
    "Job ID: 100, Status callback: , successful 0, failed 1, completionPercentage: 100%";

/// Service chatter that never matches a job pattern.
pub const CORPUS_NOISE: &[&str] = &[
    "2024-05-01 09:00:00.120 INFO  DeIdentification service starting",
    "2024-05-01 09:00:00.433 INFO  Loaded profile 'Basic Application Confidentiality'",
    "2024-05-01 09:00:01.002 INFO  Watching C:\\DeId\\Input for new files",
    "2024-05-01 09:00:05.871 DEBUG Heartbeat",
    "2024-05-01 09:00:10.871 DEBUG Heartbeat",
];

/// A log interleaving several jobs, as written while Part10 batches run.
pub const CORPUS_INTERLEAVED: &[&str] = &[
    "2024-05-01 09:01:00.000 INFO  Job ID: 200 accepted",
    "2024-05-01 09:01:00.010 INFO  Job ID: 201 accepted",
    "Job ID: 201, Status callback: , successful 1, failed 0, completionPercentage: 100%",
    "for jobID 31 took 820 ms",
    "Job ID: 200, Status callback: , successful 3, failed 0, completionPercentage: 100%",
    "for jobID 32 took 640 ms",
];

/// A service log backed by a temp directory. The file is not created until
/// the first write, so a fresh `ServiceLog` models "log not there yet".
pub struct ServiceLog {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

impl ServiceLog {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("DeIdentification.log");
        Self { _dir: dir, path }
    }

    pub fn with_lines(lines: &[&str]) -> Self {
        let log = Self::new();
        log.append(lines);
        log
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append lines, creating the file if needed.
    pub fn append(&self, lines: &[&str]) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .expect("open log for append");
        for line in lines {
            writeln!(file, "{line}").expect("append log line");
        }
    }

    /// Create the file with no content.
    pub fn touch(&self) {
        std::fs::write(&self.path, "").expect("create empty log");
    }
}

/// Write `files` (relative path, size in bytes) under `root`, creating
/// parent directories as needed.
pub fn write_tree(root: &Path, files: &[(&str, usize)]) {
    for (rel, size) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, vec![b'x'; *size]).expect("write fixture file");
    }
}
