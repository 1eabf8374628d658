//! Reporting utilities: zone and map statistics, plus formatted terminal output.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::Map2D;
use crate::engine::ResolvedZonation;

pub mod format;

pub use format::*;

/// Cell count of one numbered zone.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneStats {
    pub name: String,
    pub number: u32,
    pub cells: usize,
}

/// Summary of one written map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapStats {
    pub file: PathBuf,
    pub zone: String,
    pub property: String,
    pub date: Option<NaiveDate>,
    pub defined: usize,
    pub total: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Count the cells assigned to each zone, in declaration order.
pub fn zone_stats(zonation: &ResolvedZonation) -> Vec<ZoneStats> {
    zonation
        .zones
        .iter()
        .map(|(name, &number)| ZoneStats {
            name: name.clone(),
            number,
            cells: zonation.zone_index.iter().filter(|&&z| z == number).count(),
        })
        .collect()
}

/// Defined-column count and value range of a map.
pub fn map_stats(map: &Map2D, file: &Path) -> MapStats {
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    for v in map.values.iter().flatten() {
        min = Some(min.map_or(*v, |m| m.min(*v)));
        max = Some(max.map_or(*v, |m| m.max(*v)));
    }
    MapStats {
        file: file.to_path_buf(),
        zone: map.zone.clone(),
        property: map.property.clone(),
        date: map.date,
        defined: map.defined_count(),
        total: map.values.len(),
        min,
        max,
    }
}
