//! Configuration loading and validation.
//!
//! The configuration file is JSON. Loading happens in three steps:
//!
//! 1. deserialize into the typed schema (unknown keys are errors)
//! 2. apply command-line overrides (`--eclroot`, `--mapfolder`)
//! 3. validate cross-field rules that serde cannot express
//!
//! Anything that fails here exits with code 2 before any volume is read.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{AppError, ConfigError};

pub mod schema;

pub use schema::*;

/// Environment variable consulted when no eclroot is configured.
pub const ECLROOT_ENV: &str = "GRD3D_ECLROOT";

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub eclroot: Option<String>,
    pub mapfolder: Option<PathBuf>,
}

/// Read, override and validate a configuration file.
pub fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<RootConfig, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open config '{}': {e}", path.display())))?;
    let mut config: RootConfig = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid config '{}': {e}", path.display())))?;

    apply_overrides(&mut config, overrides);
    if config.input.eclroot.is_none() {
        dotenvy::dotenv().ok();
        config.input.eclroot = std::env::var(ECLROOT_ENV).ok();
    }

    validate(&config)?;
    Ok(config)
}

/// Parse a configuration from a JSON string (no overrides, no environment).
pub fn parse_config(text: &str) -> Result<RootConfig, AppError> {
    let config: RootConfig =
        serde_json::from_str(text).map_err(|e| AppError::new(2, format!("Invalid config: {e}")))?;
    validate(&config)?;
    Ok(config)
}

pub fn apply_overrides(config: &mut RootConfig, overrides: &ConfigOverrides) {
    if let Some(eclroot) = &overrides.eclroot {
        config.input.eclroot = Some(eclroot.clone());
    }
    if let Some(mapfolder) = &overrides.mapfolder {
        config.output.mapfolder = mapfolder.clone();
    }
}

/// Cross-field checks that do not need the grid.
pub fn validate(config: &RootConfig) -> Result<(), ConfigError> {
    config.zonation.mode()?;

    let mut seen = HashSet::new();
    for date in &config.input.dates {
        if !seen.insert(*date) {
            return Err(ConfigError::DuplicateDate(*date));
        }
    }

    for spec in &config.input.properties {
        if let Some(Threshold::PerProperty(values)) = &spec.lower_threshold {
            let names = spec.names().len();
            if values.len() != names {
                return Err(ConfigError::ThresholdCountMismatch {
                    thresholds: values.len(),
                    names,
                });
            }
        }
    }

    Ok(())
}

/// Replace the `$eclroot` token in a source path.
pub fn substitute_eclroot(source: &str, eclroot: Option<&str>) -> Result<PathBuf, ConfigError> {
    if !source.contains(ECLROOT_TOKEN) {
        return Ok(PathBuf::from(source));
    }
    let root = eclroot.ok_or_else(|| ConfigError::MissingEclroot(source.to_string()))?;
    Ok(PathBuf::from(source.replace(ECLROOT_TOKEN, root)))
}
