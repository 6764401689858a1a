//! Artifact measurement
//!
//! Runs the size tool against a record's ELF artifact and fingerprints its
//! hex image. Any failure here is a `MeasureError`; the dataset builder
//! turns it into a "Failed to get size" record instead of aborting.

use crate::config::ToolConfig;
use crate::error::MeasureError;
use crate::record::{MarkerRecord, Measurement};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

/// Measures the compiled output of a successful build
pub trait Measure {
    fn measure(&self, location: &Path, marker: &MarkerRecord) -> Result<Measurement, MeasureError>;
}

/// Production measurer backed by an external `avr-size`-style tool
#[derive(Debug, Clone)]
pub struct SizeToolMeasurer<'a> {
    config: &'a ToolConfig,
}

impl<'a> SizeToolMeasurer<'a> {
    pub fn new(config: &'a ToolConfig) -> Self {
        Self { config }
    }

    /// ELF artifact inspected by the size tool
    pub fn elf_path(&self, location: &Path, marker: &MarkerRecord) -> PathBuf {
        artifact_path(location, &self.config.build_subdir, &marker.sketch_name, &self.config.elf_suffix)
    }

    /// Hex image used for the content hash
    pub fn hex_path(&self, location: &Path, marker: &MarkerRecord) -> PathBuf {
        artifact_path(location, &self.config.build_subdir, &marker.sketch_name, &self.config.hex_suffix)
    }

    fn run_size_tool(&self, elf: &Path) -> Result<String, MeasureError> {
        let tool = &self.config.size_command;
        tracing::debug!("Running: {} -C {}", tool, elf.display());

        let output = Command::new(tool)
            .arg("-C")
            .arg(elf)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| MeasureError::ToolSpawn {
                tool: tool.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(MeasureError::ToolFailed {
                tool: tool.clone(),
                status: output.status.to_string(),
                path: elf.to_path_buf(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Measure for SizeToolMeasurer<'_> {
    fn measure(&self, location: &Path, marker: &MarkerRecord) -> Result<Measurement, MeasureError> {
        let stdout = self.run_size_tool(&self.elf_path(location, marker))?;
        let (program_size, data_size) = parse_size_output(&stdout)?;
        let content_hash = hash_file(&self.hex_path(location, marker))?;

        Ok(Measurement {
            program_size,
            data_size,
            content_hash,
        })
    }
}

fn artifact_path(location: &Path, build_subdir: &str, sketch_name: &str, suffix: &str) -> PathBuf {
    location
        .join(build_subdir)
        .join(format!("{}{}", sketch_name, suffix))
}

fn size_patterns() -> &'static (Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"^Program: *([0-9]+) bytes$").expect("static pattern"),
            Regex::new(r"^Data: *([0-9]+) bytes$").expect("static pattern"),
        )
    })
}

/// Extract program and data sizes from `<size tool> -C` output
///
/// Each of `Program: <n> bytes` and `Data: <n> bytes` must appear on a line
/// of its own exactly once.
///
/// # Example
/// ```
/// use massbuild::measure::parse_size_output;
///
/// let out = "AVR Memory Usage\n\nProgram:     928 bytes\n(.text + .data)\n\nData:          9 bytes\n";
/// assert_eq!(parse_size_output(out).unwrap(), (928, 9));
/// ```
pub fn parse_size_output(output: &str) -> Result<(u64, u64), MeasureError> {
    let (program_re, data_re) = size_patterns();
    let mut program = None;
    let mut data = None;

    for line in output.lines().map(str::trim_end) {
        if let Some(caps) = program_re.captures(line) {
            set_once(&mut program, "Program", &caps[1])?;
        }
        if let Some(caps) = data_re.captures(line) {
            set_once(&mut data, "Data", &caps[1])?;
        }
    }

    Ok((
        program.ok_or(MeasureError::MissingField { field: "Program" })?,
        data.ok_or(MeasureError::MissingField { field: "Data" })?,
    ))
}

fn set_once(slot: &mut Option<u64>, field: &'static str, digits: &str) -> Result<(), MeasureError> {
    if slot.is_some() {
        return Err(MeasureError::DuplicateField { field });
    }
    let value = digits.parse().map_err(|_| MeasureError::InvalidNumber {
        field,
        value: digits.to_string(),
    })?;
    *slot = Some(value);
    Ok(())
}

/// SHA-256 of a file, hex encoded
pub fn hash_file(path: &Path) -> Result<String, MeasureError> {
    let bytes = fs::read(path).map_err(|source| MeasureError::ArtifactRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const AVR_SIZE_OUTPUT: &str = "AVR Memory Usage\n\
        ----------------\n\
        Device: Unknown\n\
        \n\
        Program:    1066 bytes\n\
        (.text + .data + .bootloader)\n\
        \n\
        Data:          9 bytes\n\
        (.data + .bss + .noinit)\n\
        \n";

    fn marker(name: &str) -> MarkerRecord {
        MarkerRecord {
            exit_code: 0,
            sketch_dir: format!("examples/{}", name),
            sketch_name: name.to_string(),
            board: "arduino:avr:uno".to_string(),
            buildset: "base".to_string(),
        }
    }

    #[test]
    fn test_parse_avr_size_output() {
        assert_eq!(parse_size_output(AVR_SIZE_OUTPUT).unwrap(), (1066, 9));
    }

    #[test]
    fn test_parse_crlf_output() {
        let out = "Program: 10 bytes\r\nData: 2 bytes\r\n";
        assert_eq!(parse_size_output(out).unwrap(), (10, 2));
    }

    #[test]
    fn test_parse_missing_data() {
        let err = parse_size_output("Program: 10 bytes\n").unwrap_err();
        assert!(matches!(err, MeasureError::MissingField { field: "Data" }));
    }

    #[test]
    fn test_parse_duplicate_program() {
        let out = "Program: 10 bytes\nProgram: 12 bytes\nData: 2 bytes\n";
        let err = parse_size_output(out).unwrap_err();
        assert!(matches!(err, MeasureError::DuplicateField { field: "Program" }));
    }

    #[test]
    fn test_parse_rejects_indented_or_suffixed_lines() {
        let out = "  Program: 10 bytes\nData: 2 bytes (1.2% Full)\n";
        assert!(parse_size_output(out).is_err());
    }

    #[test]
    fn test_parse_overflow() {
        let out = "Program: 99999999999999999999999 bytes\nData: 2 bytes\n";
        let err = parse_size_output(out).unwrap_err();
        assert!(matches!(err, MeasureError::InvalidNumber { field: "Program", .. }));
    }

    #[test]
    fn test_hash_file_is_stable() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.hex");
        let b = dir.path().join("b.hex");
        fs::write(&a, ":00000001FF\n").unwrap();
        fs::write(&b, ":00000001FF\n").unwrap();

        let hash = hash_file(&a).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_file(&b).unwrap());
    }

    #[test]
    fn test_hash_missing_file() {
        let err = hash_file(Path::new("/nonexistent/Blink.cpp.hex")).unwrap_err();
        assert!(matches!(err, MeasureError::ArtifactRead { .. }));
    }

    #[test]
    fn test_artifact_paths() {
        let config = ToolConfig::default();
        let measurer = SizeToolMeasurer::new(&config);
        let location = Path::new("result/base/examples/Blink/uno");

        assert_eq!(
            measurer.elf_path(location, &marker("Blink")),
            location.join("build/Blink.cpp.elf")
        );
        assert_eq!(
            measurer.hex_path(location, &marker("Blink")),
            location.join("build/Blink.cpp.hex")
        );
    }

    #[test]
    fn test_missing_tool_is_spawn_error() {
        let config = ToolConfig {
            size_command: "massbuild-no-such-size-tool".to_string(),
            ..ToolConfig::default()
        };
        let dir = TempDir::new().unwrap();
        let err = SizeToolMeasurer::new(&config)
            .measure(dir.path(), &marker("Blink"))
            .unwrap_err();
        assert!(matches!(err, MeasureError::ToolSpawn { .. }));
    }
}
