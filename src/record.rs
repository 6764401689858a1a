//! Build records
//!
//! A `MarkerRecord` is what the build driver persists as `build.json` in a
//! result directory once the compiler has returned. A `BuildRecord` is the
//! marker plus the status derived while reporting. Sizes and the content
//! hash only exist inside `BuildStatus::Ok`.

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Persisted outcome of one compile attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerRecord {
    /// Exit code of the compiler invocation
    pub exit_code: i32,

    /// Sketch directory relative to the working directory (the source id)
    #[serde(alias = "source_id")]
    pub sketch_dir: String,

    /// Sketch file stem, used to name the compiled artifacts
    #[serde(default)]
    pub sketch_name: String,

    /// Board / target identifier
    #[serde(alias = "target")]
    pub board: String,

    /// Buildset this attempt belongs to
    pub buildset: String,
}

impl MarkerRecord {
    /// Parse a marker from JSON text
    ///
    /// A marker without `sketch_name` takes the last component of
    /// `sketch_dir`, which is the usual Arduino layout (`Blink/Blink.ino`).
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        let mut marker: MarkerRecord = serde_json::from_str(content)?;
        if marker.sketch_name.is_empty() {
            marker.sketch_name = Path::new(&marker.sketch_dir)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(marker)
    }

    /// Load a marker file; any read or parse failure is fatal
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ReportError::MarkerRead {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json(&content).map_err(|source| ReportError::MarkerParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the marker so readers never observe a partial file
    ///
    /// Writes a sibling temp file, syncs it and renames it into place.
    pub fn write_atomic(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let write_err = |source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut file = fs::File::create(&tmp).map_err(write_err)?;
        serde_json::to_writer(&mut file, self)?;
        file.flush().map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        fs::rename(&tmp, path).map_err(write_err)
    }

    /// Composite dataset key of this record
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.buildset, &self.sketch_dir, &self.board)
    }
}

/// Composite key (buildset, source, target), ordered field by field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub buildset: String,
    pub source_id: String,
    pub target: String,
}

impl RecordKey {
    pub fn new(buildset: &str, source_id: &str, target: &str) -> Self {
        Self {
            buildset: buildset.to_string(),
            source_id: source_id.to_string(),
            target: target.to_string(),
        }
    }

    /// Key of the same source/target in another buildset
    pub fn in_buildset(&self, buildset: &str) -> Self {
        Self {
            buildset: buildset.to_string(),
            source_id: self.source_id.clone(),
            target: self.target.clone(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.buildset, self.source_id, self.target)
    }
}

/// Size and identity of a successfully compiled artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Bytes of program memory
    pub program_size: u64,
    /// Bytes of static data
    pub data_size: u64,
    /// Opaque fingerprint of the compiled image
    pub content_hash: String,
}

/// Status of a build record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Compiled and measured
    Ok(Measurement),
    /// Compiler exited non-zero
    FailedToCompile,
    /// Compiled, but the artifact could not be measured
    FailedToGetSize,
}

impl BuildStatus {
    /// Human-readable label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            BuildStatus::Ok(_) => "OK",
            BuildStatus::FailedToCompile => "Failed to compile",
            BuildStatus::FailedToGetSize => "Failed to get size",
        }
    }

    pub fn measurement(&self) -> Option<&Measurement> {
        match self {
            BuildStatus::Ok(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A marker together with its derived status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub marker: MarkerRecord,
    pub status: BuildStatus,
}

impl BuildRecord {
    pub fn new(marker: MarkerRecord, status: BuildStatus) -> Self {
        Self { marker, status }
    }

    pub fn buildset(&self) -> &str {
        &self.marker.buildset
    }

    pub fn source_id(&self) -> &str {
        &self.marker.sketch_dir
    }

    pub fn target(&self) -> &str {
        &self.marker.board
    }

    pub fn key(&self) -> RecordKey {
        self.marker.key()
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.status, BuildStatus::Ok(_))
    }

    pub fn program_size(&self) -> Option<u64> {
        self.status.measurement().map(|m| m.program_size)
    }

    pub fn data_size(&self) -> Option<u64> {
        self.status.measurement().map(|m| m.data_size)
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.status.measurement().map(|m| m.content_hash.as_str())
    }
}
