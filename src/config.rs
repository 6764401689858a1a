//! Tool configuration
//!
//! Names of the external tools, the files that make up a build record
//! directory and the report location. Loaded once (optionally from a TOML
//! file) and passed by reference into every component.
//!
//! # Example massbuild.toml
//!
//! ```toml
//! compiler_command = "arduino"
//! size_command = "/opt/avr/bin/avr-size"
//! hex_suffix = ".ino.hex"
//! elf_suffix = ".ino.elf"
//! ```

use crate::error::ConfigError;
use crate::report::ReportFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Immutable configuration shared by the build driver and the report engine
///
/// # Example
/// ```
/// use massbuild::config::ToolConfig;
///
/// let config = ToolConfig::default();
/// assert_eq!(config.size_command, "avr-size");
/// assert_eq!(config.marker_file, "build.json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Compiler front-end invoked by `build`
    pub compiler_command: String,

    /// Size inspection tool, invoked as `<tool> -C <elf>`
    pub size_command: String,

    /// Completed-record marker file inside each result directory
    pub marker_file: String,

    /// Compiler log file inside each result directory
    pub log_file: String,

    /// Subdirectory of a result directory holding compiler output
    pub build_subdir: String,

    /// Suffix appended to the sketch name for the ELF artifact
    pub elf_suffix: String,

    /// Suffix appended to the sketch name for the hex image
    pub hex_suffix: String,

    /// Report subdirectory under the results directory
    pub report_subdir: String,

    /// Buildset picked as baseline when none is given and several exist
    pub auto_baseline: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            compiler_command: "arduino-git".to_string(),
            size_command: "avr-size".to_string(),
            marker_file: "build.json".to_string(),
            log_file: "build.log".to_string(),
            build_subdir: "build".to_string(),
            elf_suffix: ".cpp.elf".to_string(),
            hex_suffix: ".cpp.hex".to_string(),
            report_subdir: "report".to_string(),
            auto_baseline: "base".to_string(),
        }
    }
}

impl ToolConfig {
    /// Load configuration from a TOML file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ToolConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("compiler_command", &self.compiler_command),
            ("size_command", &self.size_command),
            ("marker_file", &self.marker_file),
            ("log_file", &self.log_file),
            ("build_subdir", &self.build_subdir),
            ("report_subdir", &self.report_subdir),
            ("auto_baseline", &self.auto_baseline),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
        }

        for (field, value) in [("marker_file", &self.marker_file), ("log_file", &self.log_file)] {
            if !is_plain_file_name(value) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("'{}' must be a plain file name", value),
                });
            }
        }

        if self.marker_file == self.log_file {
            return Err(ConfigError::Invalid {
                field: "log_file",
                reason: "must differ from marker_file".to_string(),
            });
        }

        // The report directory lives inside the scanned results tree
        for format in [ReportFormat::Csv, ReportFormat::Json] {
            if self.marker_file == format.file_name() {
                return Err(ConfigError::Invalid {
                    field: "marker_file",
                    reason: format!("'{}' collides with the report file name", self.marker_file),
                });
            }
        }

        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}
