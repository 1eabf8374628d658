//! Command-line parsing for the `grd3d` map generator.
//!
//! Argument parsing and command dispatch stay separate from the engine code.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "grd3d",
    version,
    about = "Aggregate 3D grid properties into per-zone 2D maps"
)]
pub struct Cli {
    /// Log level for diagnostics written to stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Aggregate every configured property (each name, each date) into maps.
    Aggregate(RunArgs),
    /// Compute CO2 mass per phase and write summed maps.
    Mass(RunArgs),
    /// Compute the migration-time volume and write minimum maps.
    MigrationTime(RunArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// JSON configuration file.
    #[arg(short = 'c', long)]
    pub config: PathBuf,

    /// Replaces `input.eclroot` from the configuration.
    #[arg(long)]
    pub eclroot: Option<String>,

    /// Replaces `output.mapfolder` from the configuration.
    #[arg(long)]
    pub mapfolder: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}
