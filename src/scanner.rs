//! Results tree scanner
//!
//! Walks a results directory and yields every directory holding a
//! completed-record marker. A marker directory is a leaf: its subtree
//! (compiler output) is never visited.

use crate::error::Result;
use crate::record::MarkerRecord;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A marker found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedRecord {
    /// Directory containing the marker
    pub location: PathBuf,
    pub marker: MarkerRecord,
}

/// Lazy, single-pass iterator over completed build records
///
/// Entries are visited in file-name order so repeated scans of an
/// unchanged tree produce the same sequence.
pub struct RecordScanner {
    walker: walkdir::IntoIter,
    marker_file: String,
}

impl RecordScanner {
    pub fn new<P: AsRef<Path>>(root: P, marker_file: &str) -> Self {
        Self {
            walker: WalkDir::new(root.as_ref())
                .sort_by_file_name()
                .into_iter(),
            marker_file: marker_file.to_string(),
        }
    }
}

impl Iterator for RecordScanner {
    type Item = Result<ScannedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(e.into())),
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            let marker_path = entry.path().join(&self.marker_file);
            if !marker_path.is_file() {
                continue;
            }

            self.walker.skip_current_dir();
            tracing::debug!("Found build record in {}", entry.path().display());

            return Some(MarkerRecord::load(&marker_path).map(|marker| ScannedRecord {
                location: entry.into_path(),
                marker,
            }));
        }
    }
}
