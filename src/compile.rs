//! Batch build driver
//!
//! Compiles each sketch for each board into
//! `<results>/<buildset>/<sketch dir>/<board>/`, then writes the
//! completed-record marker. A result directory that already has a marker
//! is skipped unless forced; one without a marker is an interrupted build
//! and is removed before rebuilding.

use crate::config::ToolConfig;
use crate::record::MarkerRecord;
use anyhow::{bail, Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

/// Runs the external compiler for one sketch/board pair
pub trait Toolchain {
    /// Compile `sketch` for `board` into `build_dir`, logging to `log`.
    /// Returns the compiler's exit code.
    fn compile(&self, sketch: &Path, board: &str, build_dir: &Path, log: &Path) -> Result<i32>;
}

/// Arduino IDE command-line front end
#[derive(Debug, Clone)]
pub struct ArduinoToolchain<'a> {
    config: &'a ToolConfig,
}

impl<'a> ArduinoToolchain<'a> {
    pub fn new(config: &'a ToolConfig) -> Self {
        Self { config }
    }

    /// Full argument list passed to the compiler
    pub fn args(&self, sketch: &Path, board: &str, build_dir: &Path) -> Vec<String> {
        vec![
            "--pref".to_string(),
            format!("build.path={}", build_dir.display()),
            "--board".to_string(),
            board.to_string(),
            "--verify".to_string(),
            sketch.display().to_string(),
            "--verbose".to_string(),
        ]
    }
}

impl Toolchain for ArduinoToolchain<'_> {
    fn compile(&self, sketch: &Path, board: &str, build_dir: &Path, log: &Path) -> Result<i32> {
        let build_dir = build_dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", build_dir.display()))?;
        let sketch = sketch
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", sketch.display()))?;
        let args = self.args(&sketch, board, &build_dir);

        let out = fs::File::create(log)
            .with_context(|| format!("Failed to create {}", log.display()))?;
        let err = out.try_clone().context("Failed to duplicate log handle")?;

        tracing::info!("Running: {} {}", self.config.compiler_command, args.join(" "));
        let status = Command::new(&self.config.compiler_command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(out)
            .stderr(err)
            .status()
            .with_context(|| format!("Failed to run {}", self.config.compiler_command))?;

        let code = status.code().unwrap_or(-1);
        tracing::info!("Returned {}", code);
        Ok(code)
    }
}

/// Options shared by every build of one `build` invocation
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub results_dir: PathBuf,
    pub buildset: String,
    pub force: bool,
}

/// What happened to one sketch/board pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Compiler ran; marker written
    Built { exit_code: i32 },
    /// A completed record already existed
    Skipped,
}

/// Split a board list on whitespace and commas
///
/// # Example
/// ```
/// use massbuild::compile::parse_board_list;
///
/// assert_eq!(
///     parse_board_list("arduino:avr:uno, arduino:avr:mega  arduino:sam:due"),
///     vec!["arduino:avr:uno", "arduino:avr:mega", "arduino:sam:due"]
/// );
/// ```
pub fn parse_board_list(boards: &str) -> Vec<String> {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    let separator = SEPARATOR.get_or_init(|| Regex::new(r"[\s,]+").expect("static pattern"));
    separator
        .split(boards)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}

/// Sketches must be existing files, given as relative paths inside the
/// working directory
pub fn validate_sketch_path(sketch: &Path) -> Result<()> {
    let normalized = normalize_sketch_path(sketch);
    if sketch.is_absolute() || matches!(normalized.components().next(), Some(Component::ParentDir)) {
        bail!(
            "Sketch filenames must be relative paths, inside the current directory: {}",
            sketch.display()
        );
    }
    if normalized.file_stem().is_none() {
        bail!("Sketch path has no file name: {}", sketch.display());
    }
    if !sketch.is_file() {
        bail!("Sketch file does not exist or is not a file: {}", sketch.display());
    }
    Ok(())
}

/// Drop `.` components so `./Blink/Blink.ino` and `Blink/Blink.ino` name
/// the same sketch
pub fn normalize_sketch_path(sketch: &Path) -> PathBuf {
    sketch
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Sketch directory as recorded in the marker (the source id)
pub fn sketch_dir(sketch: &Path) -> PathBuf {
    normalize_sketch_path(sketch)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Result directory of one sketch/board pair
pub fn result_dir_for(results_dir: &Path, buildset: &str, sketch: &Path, board: &str) -> PathBuf {
    results_dir.join(buildset).join(sketch_dir(sketch)).join(board)
}

/// Runs sketch × board builds sequentially
pub struct BuildDriver<'a, T: Toolchain> {
    config: &'a ToolConfig,
    toolchain: T,
}

impl<'a, T: Toolchain> BuildDriver<'a, T> {
    pub fn new(config: &'a ToolConfig, toolchain: T) -> Self {
        Self { config, toolchain }
    }

    /// Build every sketch for every board
    pub fn build_all(
        &self,
        request: &BuildRequest,
        sketches: &[PathBuf],
        boards: &[String],
    ) -> Result<Vec<BuildOutcome>> {
        for sketch in sketches {
            validate_sketch_path(sketch)?;
        }

        let mut outcomes = Vec::with_capacity(sketches.len() * boards.len());
        for sketch in sketches {
            for board in boards {
                outcomes.push(self.build_one(request, sketch, board)?);
            }
        }
        Ok(outcomes)
    }

    /// Build one sketch for one board
    pub fn build_one(&self, request: &BuildRequest, sketch: &Path, board: &str) -> Result<BuildOutcome> {
        let result_dir = result_dir_for(&request.results_dir, &request.buildset, sketch, board);
        let marker_path = result_dir.join(&self.config.marker_file);
        let label = sketch_dir(sketch).join(board);

        if result_dir.exists() {
            if !marker_path.exists() {
                tracing::info!("{} looks interrupted, removing", label.display());
            } else if request.force {
                tracing::info!("{} already exists, removing", label.display());
            } else {
                tracing::info!("{} already exists, skipping", label.display());
                return Ok(BuildOutcome::Skipped);
            }
            fs::remove_dir_all(&result_dir)
                .with_context(|| format!("Failed to remove {}", result_dir.display()))?;
        }

        let build_dir = result_dir.join(&self.config.build_subdir);
        fs::create_dir_all(&build_dir)
            .with_context(|| format!("Failed to create {}", build_dir.display()))?;

        let exit_code = self.toolchain.compile(
            sketch,
            board,
            &build_dir,
            &result_dir.join(&self.config.log_file),
        )?;

        let marker = MarkerRecord {
            exit_code,
            sketch_dir: sketch_dir(sketch).to_string_lossy().into_owned(),
            sketch_name: sketch
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            board: board.to_string(),
            buildset: request.buildset.clone(),
        };
        marker.write_atomic(&marker_path)?;

        if exit_code != 0 {
            tracing::warn!("{} failed to compile (exit code {})", label.display(), exit_code);
        }
        Ok(BuildOutcome::Built { exit_code })
    }
}
