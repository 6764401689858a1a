//! CLI argument parsing for massbuild

use crate::report::ReportFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "massbuild")]
#[command(version)]
#[command(about = "Batch-compile sketches for many boards and compare buildsets", long_about = None)]
pub struct Cli {
    /// More verbose output (-v: progress, -vv: debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Enable trace-level diagnostics
    #[arg(long, global = true)]
    pub debug: bool,

    /// Tool configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile sketches for every board into a buildset
    Build(BuildArgs),
    /// Scan results and write a comparison report
    Report(ReportArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Directory to store results in
    #[arg(short = 'r', long = "results-dir", default_value = "result")]
    pub results_dir: PathBuf,

    /// Boards to build for (whitespace or comma-separated)
    #[arg(short = 'b', long = "boards", default_value = "arduino:avr:uno")]
    pub boards: String,

    /// Arbitrary name to identify these builds
    #[arg(short = 's', long = "buildset", default_value = "base")]
    pub buildset: String,

    /// Overwrite existing builds
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Sketch files, relative to the current directory
    #[arg(required = true)]
    pub sketches: Vec<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Directory to read results from
    #[arg(short = 'r', long = "results-dir", default_value = "result")]
    pub results_dir: PathBuf,

    /// Base buildset to compare things against
    #[arg(short = 'B', long = "base-set", value_name = "BUILDSET")]
    pub base_set: Option<String>,

    /// Report format
    #[arg(long = "format", value_enum, default_value = "csv")]
    pub format: ReportFormat,
}
