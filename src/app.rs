//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - loads and validates the configuration
//! - runs the requested pipeline
//! - forwards diagnostics to the log and prints the run summary

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::cli::{Cli, Command, RunArgs};
use crate::config::{ConfigOverrides, RootConfig, load_config};
use crate::domain::{Diagnostic, DiagnosticLevel};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `grd3d` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::from(cli.log_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::new(4, format!("Failed to initialize logging: {e}")))?;

    match cli.command {
        Command::Aggregate(args) => handle(&args, "Aggregated maps", pipeline::run_aggregate),
        Command::Mass(args) => handle(&args, "CO2 mass maps", pipeline::run_mass),
        Command::MigrationTime(args) => handle(&args, "Migration time maps", pipeline::run_migration_time),
    }
}

fn handle(
    args: &RunArgs,
    title: &str,
    run: fn(&RootConfig) -> Result<pipeline::RunOutput, AppError>,
) -> Result<(), AppError> {
    let config = load_config(&args.config, &overrides_from_args(args))?;
    info!("loaded config {}", args.config.display());

    let output = run(&config)?;
    log_diagnostics(&output.diagnostics);

    println!(
        "{}",
        crate::report::format_run_summary(title, &output.zonation, &output.maps)
    );
    Ok(())
}

pub fn overrides_from_args(args: &RunArgs) -> ConfigOverrides {
    ConfigOverrides {
        eclroot: args.eclroot.clone(),
        mapfolder: args.mapfolder.clone(),
    }
}

fn log_diagnostics(diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        match d.level {
            DiagnosticLevel::Info => info!("{}", d.message),
            DiagnosticLevel::Warning => warn!("{}", d.message),
        }
    }
}
