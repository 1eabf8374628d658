//! Error types.
//!
//! `AppError` is what the binary reports: a message plus the process exit code.
//!
//! - `2`: configuration or input problems (nothing was computed)
//! - `3`: insufficient data to produce any output
//! - `4`: computation or output failures
//!
//! The engine itself reports typed errors (`ConfigError`, `EngineError`) which
//! convert into `AppError` at the application boundary.

use thiserror::Error;

#[derive(Clone, Error)]
#[error("{message}")]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

/// Problems found while validating a configuration, before any array work.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Cannot have both \"zproperty\" and \"zranges\" in \"zonation\"")]
    ConflictingZonation,

    #[error("Zone '{zone}': invalid layer range [{k_start}, {k_end}] for a grid with nz={nz}")]
    InvalidLayerRange {
        zone: String,
        k_start: usize,
        k_end: usize,
        nz: usize,
    },

    #[error("Duplicate zone name '{0}' (zone names are compared ignoring case)")]
    DuplicateZone(String),

    #[error("Name '{0}' is reserved for the whole-grid map")]
    ReservedName(String),

    #[error("Name '{0}' contains a path separator")]
    InvalidName(String),

    #[error("Super-zone '{superzone}' refers to unknown zone '{member}'")]
    UnknownSuperzoneMember { superzone: String, member: String },

    #[error("Super-zone name '{0}' collides with an existing zone or super-zone (ignoring case)")]
    SuperzoneCollision(String),

    #[error("More than one map would be written to '{0}'")]
    DuplicateMapOutput(String),

    #[error("Expected exactly one key in entry, found {0}")]
    NotSingleKey(usize),

    #[error("Source '{0}' uses $eclroot but no eclroot was configured")]
    MissingEclroot(String),

    #[error("CO2 mass computation does not take a property as input")]
    MassWithProperties,

    #[error("CO2 mass computation needs co2_mass_settings as input")]
    MissingMassSettings,

    #[error("Migration time computation is only supported for a single property")]
    MultiplePropertyGroups,

    #[error("Migration time computation needs one input property")]
    NoPropertyGroup,

    #[error("Time migration maps are not supported for any of the properties provided")]
    NoSupportedProperties,

    #[error("Got {thresholds} thresholds for {names} property names")]
    ThresholdCountMismatch { thresholds: usize, names: usize },

    #[error("Date {0} is listed more than once")]
    DuplicateDate(chrono::NaiveDate),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(2, err.to_string())
    }
}

/// Failures inside the numeric engine (shape mismatches, missing inputs).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("{what}: expected shape {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("No dated volumes were supplied")]
    EmptyTimeSeries,

    #[error("Property '{0}' not found in source")]
    UnknownProperty(String),

    #[error("Property '{name}' is missing at date {date}")]
    MissingProperty { name: String, date: chrono::NaiveDate },
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let code = match err {
            EngineError::EmptyTimeSeries => 3,
            EngineError::UnknownProperty(_) => 2,
            EngineError::ShapeMismatch { .. } | EngineError::MissingProperty { .. } => 4,
        };
        AppError::new(code, err.to_string())
    }
}
