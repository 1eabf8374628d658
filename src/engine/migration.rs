//! Migration time: the earliest date at which a tracked property reaches its
//! threshold in each cell.
//!
//! Times are elapsed years since the first date of the series. Cells that never
//! cross (and inactive cells) hold [`NO_ARRIVAL`], which aggregation skips.

use ndarray::{Array3, Zip};

use crate::config::{DEFAULT_LOWER_THRESHOLD, Threshold};
use crate::domain::{Diagnostic, Grid, PropertyVolume, TimeSeries};
use crate::error::{ConfigError, EngineError};

/// Properties accepted as migration indicators.
pub const MIGRATION_TIME_PROPERTIES: [&str; 10] = [
    "AMFG", "AMFW", "YMFG", "YMFW", "XMF1", "XMF2", "YMF1", "YMF2", "SGAS", "SWAT",
];

/// Name of the computed volume.
pub const MIGRATION_TIME_NAME: &str = "MigrationTime";

/// Value of a cell the front never reached.
pub const NO_ARRIVAL: f64 = f64::NAN;

const DAYS_PER_YEAR: f64 = 365.0;

/// A property name paired with the threshold it must meet or exceed.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedProperty {
    pub name: String,
    pub threshold: f64,
}

pub fn is_no_arrival(value: f64) -> bool {
    value.is_nan()
}

/// Pair names with thresholds and drop names that are not migration indicators.
///
/// Dropping some names is reported as a warning; dropping all of them is fatal.
pub fn select_tracked(
    names: &[String],
    threshold: Option<&Threshold>,
) -> Result<(Vec<TrackedProperty>, Vec<Diagnostic>), ConfigError> {
    let thresholds: Vec<f64> = match threshold {
        None => vec![DEFAULT_LOWER_THRESHOLD; names.len()],
        Some(Threshold::Scalar(t)) => vec![*t; names.len()],
        Some(Threshold::PerProperty(values)) => {
            if values.len() != names.len() {
                return Err(ConfigError::ThresholdCountMismatch {
                    thresholds: values.len(),
                    names: names.len(),
                });
            }
            values.clone()
        }
    };

    let (supported, dropped): (Vec<_>, Vec<_>) = names
        .iter()
        .zip(thresholds)
        .partition(|(name, _)| MIGRATION_TIME_PROPERTIES.contains(&name.as_str()));

    if supported.is_empty() {
        return Err(ConfigError::NoSupportedProperties);
    }

    let mut diagnostics = Vec::new();
    if !dropped.is_empty() {
        let list: Vec<&str> = dropped.iter().map(|(name, _)| name.as_str()).collect();
        diagnostics.push(Diagnostic::warning(format!(
            "Time migration maps are not supported for these properties: {}",
            list.join(", ")
        )));
    }

    let tracked = supported
        .into_iter()
        .map(|(name, threshold)| TrackedProperty {
            name: name.clone(),
            threshold,
        })
        .collect();
    Ok((tracked, diagnostics))
}

/// Reduce a dated series of volumes to one migration-time volume.
///
/// Every tracked property must be present at every date. The first date at
/// which any tracked property meets its threshold is final for that cell.
pub fn compute_migration_time(
    grid: &Grid,
    series: &TimeSeries,
    tracked: &[TrackedProperty],
) -> Result<PropertyVolume, EngineError> {
    let first = *series.keys().next().ok_or(EngineError::EmptyTimeSeries)?;
    let mut times = Array3::from_elem(grid.dimensions(), NO_ARRIVAL);

    for (date, volumes) in series {
        let years = (*date - first).num_days() as f64 / DAYS_PER_YEAR;
        for prop in tracked {
            let volume = volumes
                .iter()
                .find(|v| v.name == prop.name)
                .ok_or_else(|| EngineError::MissingProperty {
                    name: prop.name.clone(),
                    date: *date,
                })?;
            grid.check_dims(&volume.name, volume.dimensions())?;

            Zip::from(&mut times)
                .and(&volume.values)
                .and(grid.actnum())
                .for_each(|t, &v, &active| {
                    if active && is_no_arrival(*t) && v >= prop.threshold {
                        *t = years;
                    }
                });
        }
    }

    Ok(PropertyVolume::new(MIGRATION_TIME_NAME, None, times))
}
