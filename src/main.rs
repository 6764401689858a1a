use anyhow::{Context, Result};
use clap::Parser;
use massbuild::cli::{BuildArgs, Cli, Commands, ReportArgs};
use massbuild::compile::{self, ArduinoToolchain, BuildDriver, BuildOutcome, BuildRequest};
use massbuild::config::ToolConfig;
use massbuild::measure::SizeToolMeasurer;
use massbuild::report;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; warnings are always shown on stderr
fn init_tracing(verbose: u8, debug: bool) {
    let level = match (debug, verbose) {
        (true, _) => tracing::Level::TRACE,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::INFO,
        (false, _) => tracing::Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

fn load_config(cli: &Cli) -> Result<ToolConfig> {
    match &cli.config {
        Some(path) => ToolConfig::from_file(path)
            .with_context(|| format!("Invalid configuration {}", path.display())),
        None => Ok(ToolConfig::default()),
    }
}

fn run_build(config: &ToolConfig, args: BuildArgs) -> Result<()> {
    let boards = compile::parse_board_list(&args.boards);
    if boards.is_empty() {
        anyhow::bail!("No boards given");
    }

    let request = BuildRequest {
        results_dir: args.results_dir,
        buildset: args.buildset,
        force: args.force,
    };

    let driver = BuildDriver::new(config, ArduinoToolchain::new(config));
    let outcomes = driver.build_all(&request, &args.sketches, &boards)?;

    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, BuildOutcome::Built { exit_code } if *exit_code != 0))
        .count();
    let skipped = outcomes.iter().filter(|o| **o == BuildOutcome::Skipped).count();
    println!(
        "{} builds: {} failed to compile, {} skipped",
        outcomes.len(),
        failed,
        skipped
    );
    Ok(())
}

fn run_report(config: &ToolConfig, args: ReportArgs) -> Result<()> {
    if !args.results_dir.is_dir() {
        anyhow::bail!(
            "Results directory does not exist: {}",
            args.results_dir.display()
        );
    }

    let measurer = SizeToolMeasurer::new(config);
    let summary = report::generate_report(
        config,
        &args.results_dir,
        args.base_set.as_deref(),
        args.format,
        &measurer,
    )
    .context("Report failed")?;

    if let Some(baseline) = &summary.baseline {
        tracing::info!(
            "Compared against '{}' ({} records without counterpart)",
            baseline,
            summary.missing_baseline
        );
    }
    println!("{}", summary.path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    let config = load_config(&cli)?;
    match cli.command {
        Commands::Build(args) => run_build(&config, args),
        Commands::Report(args) => run_report(&config, args),
    }
}
