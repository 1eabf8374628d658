//! Shared domain types.
//!
//! Volumes are dense `(nx, ny, nz)` arrays and maps are dense `(nx, ny)` arrays,
//! both in `ndarray` standard (row-major, k fastest) layout.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// `(nx, ny, nz)`.
pub type Dims = (usize, usize, usize);

/// Per-cell zone numbers. `0` means the cell belongs to no named zone.
pub type ZoneIndexVolume = Array3<u32>;

/// Property volumes keyed by date, iterated chronologically.
pub type TimeSeries = BTreeMap<NaiveDate, Vec<PropertyVolume>>;

/// Structural grid descriptor: dimensions plus the active-cell mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    actnum: Array3<bool>,
}

impl Grid {
    /// A grid where every cell is active.
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            actnum: Array3::from_elem((nx, ny, nz), true),
        }
    }

    pub fn with_actnum(actnum: Array3<bool>) -> Self {
        Self { actnum }
    }

    pub fn dimensions(&self) -> Dims {
        self.actnum.dim()
    }

    pub fn nz(&self) -> usize {
        self.actnum.dim().2
    }

    pub fn actnum(&self) -> &Array3<bool> {
        &self.actnum
    }

    pub fn active_count(&self) -> usize {
        self.actnum.iter().filter(|&&a| a).count()
    }

    /// Fail with a descriptive error if `actual` does not match the grid.
    pub fn check_dims(&self, what: &str, actual: Dims) -> Result<(), EngineError> {
        let expected = self.dimensions();
        if expected != actual {
            return Err(EngineError::ShapeMismatch {
                what: what.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

/// One 3D property for one date (or static when `date` is `None`).
///
/// Undefined cells hold `NaN`; aggregation never selects them.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyVolume {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub values: Array3<f64>,
}

impl PropertyVolume {
    pub fn new(name: impl Into<String>, date: Option<NaiveDate>, values: Array3<f64>) -> Self {
        Self {
            name: name.into(),
            date,
            values,
        }
    }

    pub fn dimensions(&self) -> Dims {
        self.values.dim()
    }
}

/// Column reduction applied by the vertical aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMethod {
    Sum,
    Mean,
    Min,
    Max,
}

impl AggregationMethod {
    /// Lower-case tag used in output file names.
    pub fn tag(self) -> &'static str {
        match self {
            AggregationMethod::Sum => "sum",
            AggregationMethod::Mean => "mean",
            AggregationMethod::Min => "min",
            AggregationMethod::Max => "max",
        }
    }
}

/// Which cells of a column take part in one aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneSelector {
    /// Cells whose zone number equals this value.
    Zone(u32),
    /// Cells belonging to any of the listed zones.
    SuperZone(Vec<u32>),
    /// Every active cell, zone membership ignored.
    All,
}

impl ZoneSelector {
    /// Whether a cell with zone number `zone` is selected.
    pub fn selects(&self, zone: u32) -> bool {
        match self {
            ZoneSelector::Zone(n) => *n == zone,
            ZoneSelector::SuperZone(members) => members.contains(&zone),
            ZoneSelector::All => true,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, ZoneSelector::All)
    }
}

/// A 2D map produced from one property volume.
///
/// `None` cells are no-data: no active cell in that column matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Map2D {
    pub zone: String,
    pub method: AggregationMethod,
    pub property: String,
    pub date: Option<NaiveDate>,
    pub values: Array2<Option<f64>>,
}

impl Map2D {
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values[[i, j]]
    }

    /// Number of columns holding a value.
    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Severity of a recoverable condition reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
}

/// A recoverable condition returned alongside a computed artifact.
///
/// The engine never logs; the caller decides where these go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superzone_selects_any_member() {
        let sel = ZoneSelector::SuperZone(vec![1, 3]);
        assert!(sel.selects(1));
        assert!(!sel.selects(2));
        assert!(sel.selects(3));
        assert!(!sel.selects(0));
    }

    #[test]
    fn all_selects_unzoned_cells() {
        assert!(ZoneSelector::All.selects(0));
        assert!(!ZoneSelector::Zone(2).selects(0));
    }

    #[test]
    fn check_dims_reports_mismatch() {
        let grid = Grid::new(2, 3, 4);
        assert!(grid.check_dims("zone", (2, 3, 4)).is_ok());
        let err = grid.check_dims("SGAS", (2, 3, 5)).unwrap_err();
        assert!(err.to_string().contains("SGAS"));
    }
}
