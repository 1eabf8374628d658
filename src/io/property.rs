//! Property bundle read/write and extraction.
//!
//! A bundle holds any number of named volumes, static or dated:
//!
//! ```json
//! {"properties": [
//!   {"name": "PORV", "values": [...]},
//!   {"name": "SGAS", "date": "20300101", "values": [0.0, null, ...]}
//! ]}
//! ```
//!
//! `null` is an undefined cell and becomes `NaN` in memory.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::config::parse_date;
use crate::domain::{Grid, PropertyVolume, TimeSeries};
use crate::error::{AppError, EngineError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BundleFile {
    properties: Vec<RecordFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordFile {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    values: Vec<Option<f64>>,
}

/// Volumes read from one source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBundle {
    volumes: Vec<PropertyVolume>,
}

impl PropertyBundle {
    pub fn from_volumes(volumes: Vec<PropertyVolume>) -> Self {
        Self { volumes }
    }

    /// Read a bundle; every record must match the grid dimensions.
    pub fn read(path: &Path, grid: &Grid) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::new(2, format!("Failed to open property file '{}': {e}", path.display()))
        })?;
        let raw: BundleFile = serde_json::from_reader(file).map_err(|e| {
            AppError::new(2, format!("Invalid property file '{}': {e}", path.display()))
        })?;

        let dims = grid.dimensions();
        let mut volumes = Vec::with_capacity(raw.properties.len());
        for record in raw.properties {
            let date = record
                .date
                .as_deref()
                .map(parse_date)
                .transpose()
                .map_err(|e| AppError::new(2, format!("Property '{}': {e}", record.name)))?;
            let values: Vec<f64> = record.values.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            let n = values.len();
            let values = Array3::from_shape_vec(dims, values).map_err(|_| {
                AppError::new(
                    2,
                    format!(
                        "Property '{}' in '{}' has {n} values, grid has {}",
                        record.name,
                        path.display(),
                        dims.0 * dims.1 * dims.2
                    ),
                )
            })?;
            volumes.push(PropertyVolume::new(record.name, date, values));
        }
        Ok(Self { volumes })
    }

    /// Write the bundle as JSON.
    pub fn write(&self, path: &Path) -> Result<(), AppError> {
        let raw = BundleFile {
            properties: self
                .volumes
                .iter()
                .map(|v| RecordFile {
                    name: v.name.clone(),
                    date: v.date.map(|d| d.format("%Y%m%d").to_string()),
                    values: v.values.iter().map(|&x| if x.is_nan() { None } else { Some(x) }).collect(),
                })
                .collect(),
        };
        let file = File::create(path).map_err(|e| {
            AppError::new(4, format!("Failed to create property file '{}': {e}", path.display()))
        })?;
        serde_json::to_writer(file, &raw)
            .map_err(|e| AppError::new(4, format!("Failed to write property file: {e}")))
    }

    /// Distinct property names in file order.
    pub fn names(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for v in &self.volumes {
            if !out.contains(&v.name) {
                out.push(v.name.clone());
            }
        }
        out
    }

    pub fn contains(&self, name: &str) -> bool {
        self.volumes.iter().any(|v| v.name == name)
    }

    /// Sorted dates at which `name` is available.
    pub fn dates(&self, name: &str) -> Vec<NaiveDate> {
        let set: BTreeSet<NaiveDate> = self
            .volumes
            .iter()
            .filter(|v| v.name == name)
            .filter_map(|v| v.date)
            .collect();
        set.into_iter().collect()
    }

    /// Volumes of `name` for the requested dates.
    ///
    /// - no dates requested: every record of `name`, static first, then by date
    /// - `name` only exists as a static record: that record, dates ignored
    /// - otherwise: one record per requested date, each of which must exist
    pub fn select(&self, name: &str, dates: &[NaiveDate]) -> Result<Vec<PropertyVolume>, EngineError> {
        let mut records: Vec<&PropertyVolume> = self.volumes.iter().filter(|v| v.name == name).collect();
        if records.is_empty() {
            return Err(EngineError::UnknownProperty(name.to_string()));
        }
        records.sort_by_key(|v| v.date);

        if dates.is_empty() || records.iter().all(|v| v.date.is_none()) {
            return Ok(records.into_iter().cloned().collect());
        }

        dates
            .iter()
            .map(|&d| {
                records
                    .iter()
                    .find(|v| v.date == Some(d))
                    .map(|v| (*v).clone())
                    .ok_or_else(|| EngineError::MissingProperty {
                        name: name.to_string(),
                        date: d,
                    })
            })
            .collect()
    }
}

/// Build a dated series of `names` from one bundle.
///
/// Without explicit dates, every date at which any of `names` exists is used;
/// each name must then be present at each of those dates.
pub fn extract_series(bundle: &PropertyBundle, names: &[&str], dates: &[NaiveDate]) -> Result<TimeSeries, EngineError> {
    let dates: Vec<NaiveDate> = if dates.is_empty() {
        let mut all = BTreeSet::new();
        for name in names {
            if !bundle.contains(name) {
                return Err(EngineError::UnknownProperty(name.to_string()));
            }
            all.extend(bundle.dates(name));
        }
        all.into_iter().collect()
    } else {
        dates.to_vec()
    };

    let mut series = TimeSeries::new();
    for date in dates {
        let mut volumes = Vec::with_capacity(names.len());
        for name in names {
            let mut selected = bundle.select(name, &[date])?;
            match selected.pop() {
                Some(v) if v.date == Some(date) => volumes.push(v),
                _ => {
                    return Err(EngineError::MissingProperty {
                        name: name.to_string(),
                        date,
                    });
                }
            }
        }
        series.insert(date, volumes);
    }
    Ok(series)
}

/// Load a zone-code volume; usable directly as a `ZoneCodeLoader`.
pub fn load_zone_codes(source: &Path, name: &str, grid: &Grid) -> Result<PropertyVolume, AppError> {
    let bundle = PropertyBundle::read(source, grid)?;
    let mut volumes = bundle.select(name, &[])?;
    volumes
        .drain(..)
        .next()
        .ok_or_else(|| AppError::new(2, format!("Zone property '{name}' not found in '{}'", source.display())))
}
