//! Point-in-time counts of a tree the service writes to.
//!
//! The tree is mutated concurrently while it is walked, so entries that
//! vanish or cannot be read mid-walk are skipped. Only a root that exists
//! but cannot be opened at all is an error.

use crate::error::VerifyError;
use crate::types::{DirectoryDelta, DirectoryStats};
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Count sub-directories, files, and file bytes under `root`.
///
/// A missing root yields all-zero stats: "not created yet" is a legitimate
/// state before a job runs.
pub fn snapshot(root: &Path) -> Result<DirectoryStats, VerifyError> {
    if !root.exists() {
        return Ok(DirectoryStats::default());
    }

    let mut stats = DirectoryStats::default();
    let mut skipped = 0usize;

    for entry in WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                // Root disappeared between the existence check and the walk.
                if err.io_error().map(std::io::Error::kind) == Some(std::io::ErrorKind::NotFound)
                {
                    return Ok(DirectoryStats::default());
                }
                return Err(VerifyError::DirectoryScan {
                    path: root.to_path_buf(),
                    source: err,
                });
            }
            Err(err) => {
                debug!(error = %err, "skipping unreadable entry");
                skipped += 1;
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            stats.directory_count += 1;
        } else if file_type.is_file() {
            match entry.metadata() {
                Ok(meta) => {
                    stats.file_count += 1;
                    stats.total_bytes += meta.len();
                }
                Err(err) => {
                    debug!(path = %entry.path().display(), error = %err, "skipping file without metadata");
                    skipped += 1;
                }
            }
        }
    }

    debug!(
        root = %root.display(),
        dirs = stats.directory_count,
        files = stats.file_count,
        bytes = stats.total_bytes,
        skipped,
        "directory snapshot"
    );
    Ok(stats)
}

/// Field-wise `after - before`. Never clamped.
pub fn delta(before: &DirectoryStats, after: &DirectoryStats) -> DirectoryDelta {
    DirectoryDelta {
        directories_created: signed_diff(after.directory_count, before.directory_count),
        files_created: signed_diff(after.file_count, before.file_count),
        bytes_increase: signed_diff(after.total_bytes, before.total_bytes),
    }
}

fn signed_diff(after: u64, before: u64) -> i64 {
    let diff = i128::from(after) - i128::from(before);
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}
