//! Zone-index volume and zone dictionaries.
//!
//! A zonation comes from exactly one of two inputs:
//!
//! - explicit layer ranges (`zranges`), assigned in declaration order so a later
//!   range overwrites an earlier one where they overlap
//! - an integer-coded property (`zproperty`) where each zone lists the raw codes
//!   that belong to it
//!
//! Zones are numbered 1, 2, 3, … in declaration order in both modes; 0 marks a
//! cell outside every named zone. Super-zones are named unions of zones and
//! never touch the volume.

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use ndarray::{Array3, Zip, s};

use crate::config::{Named, ZProperty, Zonation, ZonationMode, substitute_eclroot};
use crate::domain::{Diagnostic, Grid, PropertyVolume, ZoneIndexVolume, ZoneSelector};
use crate::error::{AppError, ConfigError};

/// Name of the whole-grid entry present in every merged dictionary.
pub const ALL_ZONES: &str = "all";

/// Loads the raw zone-code volume for `zproperty` zonations.
pub trait ZoneCodeLoader {
    fn load_codes(&self, source: &Path, name: &str, grid: &Grid) -> Result<PropertyVolume, AppError>;
}

impl<F> ZoneCodeLoader for F
where
    F: Fn(&Path, &str, &Grid) -> Result<PropertyVolume, AppError>,
{
    fn load_codes(&self, source: &Path, name: &str, grid: &Grid) -> Result<PropertyVolume, AppError> {
        self(source, name, grid)
    }
}

/// Zone names, super-zone names and `"all"`, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergedZones {
    entries: IndexMap<String, ZoneSelector>,
}

impl MergedZones {
    pub fn get(&self, name: &str) -> Option<&ZoneSelector> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ZoneSelector)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Output of zonation resolution; read-only for the rest of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedZonation {
    pub zone_index: ZoneIndexVolume,
    pub zones: IndexMap<String, u32>,
    pub superzones: IndexMap<String, Vec<u32>>,
    pub merged: MergedZones,
    pub diagnostics: Vec<Diagnostic>,
}

/// Build the zone-index volume and the merged zone dictionary.
///
/// Conflicting zonation inputs are rejected before anything is loaded.
pub fn resolve<L: ZoneCodeLoader>(
    config: &Zonation,
    eclroot: Option<&str>,
    grid: &Grid,
    loader: &L,
) -> Result<ResolvedZonation, AppError> {
    let (zone_index, zones) = match config.mode()? {
        ZonationMode::None => (Array3::zeros(grid.dimensions()), IndexMap::new()),
        ZonationMode::Ranges(ranges) => zones_from_ranges(ranges, grid)?,
        ZonationMode::Property(zprop) => {
            check_zone_names(zprop.zones.iter().map(|z| z.name.as_str()))?;
            let source = substitute_eclroot(&zprop.source, eclroot)?;
            let codes = loader.load_codes(&source, &zprop.name, grid)?;
            grid.check_dims(&zprop.name, codes.dimensions())?;
            zones_from_codes(zprop, &codes, grid)
        }
    };

    let superzones = resolve_superzones(&config.superranges, &zones)?;
    let merged = merge(&zones, &superzones);
    let diagnostics = empty_zone_warnings(&zone_index, &zones);

    Ok(ResolvedZonation {
        zone_index,
        zones,
        superzones,
        merged,
        diagnostics,
    })
}

/// Assign zones from 1-based inclusive layer ranges.
pub fn zones_from_ranges(
    ranges: &[Named<[usize; 2]>],
    grid: &Grid,
) -> Result<(ZoneIndexVolume, IndexMap<String, u32>), ConfigError> {
    check_zone_names(ranges.iter().map(|r| r.name.as_str()))?;

    let nz = grid.nz();
    let mut zone_index = Array3::zeros(grid.dimensions());
    let mut zones = IndexMap::new();

    for (idx, range) in ranges.iter().enumerate() {
        let [k_start, k_end] = range.value;
        if k_start < 1 || k_start > k_end || k_end > nz {
            return Err(ConfigError::InvalidLayerRange {
                zone: range.name.clone(),
                k_start,
                k_end,
                nz,
            });
        }
        let number = zone_number(idx);
        // Later ranges overwrite earlier ones on overlap.
        zone_index.slice_mut(s![.., .., (k_start - 1)..k_end]).fill(number);
        zones.insert(range.name.clone(), number);
    }

    Ok((zone_index, zones))
}

/// Assign zones by matching raw integer codes.
///
/// Codes are truncated to integers; inactive and undefined cells stay 0.
pub fn zones_from_codes(
    zprop: &ZProperty,
    codes: &PropertyVolume,
    grid: &Grid,
) -> (ZoneIndexVolume, IndexMap<String, u32>) {
    let mut zone_index = Array3::zeros(grid.dimensions());
    let mut zones = IndexMap::new();

    for (idx, zone) in zprop.zones.iter().enumerate() {
        let number = zone_number(idx);
        for &code in &zone.value {
            Zip::from(&mut zone_index)
                .and(&codes.values)
                .and(grid.actnum())
                .for_each(|z, &raw, &active| {
                    if active && raw.is_finite() && raw.trunc() as i64 == code {
                        *z = number;
                    }
                });
        }
        zones.insert(zone.name.clone(), number);
    }

    (zone_index, zones)
}

/// Resolve super-zone member names to zone numbers, preserving order.
pub fn resolve_superzones(
    superranges: &[Named<Vec<String>>],
    zones: &IndexMap<String, u32>,
) -> Result<IndexMap<String, Vec<u32>>, ConfigError> {
    let mut out: IndexMap<String, Vec<u32>> = IndexMap::new();
    // Names end up lower-cased in output file names.
    let mut taken: HashSet<String> = zones.keys().map(|name| name.to_lowercase()).collect();
    for superzone in superranges {
        check_name(&superzone.name)?;
        if !taken.insert(superzone.name.to_lowercase()) {
            return Err(ConfigError::SuperzoneCollision(superzone.name.clone()));
        }
        let members = superzone
            .value
            .iter()
            .map(|member| {
                zones
                    .get(member)
                    .copied()
                    .ok_or_else(|| ConfigError::UnknownSuperzoneMember {
                        superzone: superzone.name.clone(),
                        member: member.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        out.insert(superzone.name.clone(), members);
    }
    Ok(out)
}

/// Zones first, then super-zones, then `"all"`.
pub fn merge(zones: &IndexMap<String, u32>, superzones: &IndexMap<String, Vec<u32>>) -> MergedZones {
    let mut entries = IndexMap::with_capacity(zones.len() + superzones.len() + 1);
    for (name, &number) in zones {
        entries.insert(name.clone(), ZoneSelector::Zone(number));
    }
    for (name, members) in superzones {
        entries.insert(name.clone(), ZoneSelector::SuperZone(members.clone()));
    }
    entries.insert(ALL_ZONES.to_string(), ZoneSelector::All);
    MergedZones { entries }
}

fn zone_number(idx: usize) -> u32 {
    idx as u32 + 1
}

fn check_zone_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for name in names {
        check_name(name)?;
        if !seen.insert(name.to_lowercase()) {
            return Err(ConfigError::DuplicateZone(name.to_string()));
        }
    }
    Ok(())
}

/// A zone or super-zone name must be usable as a file-name component.
fn check_name(name: &str) -> Result<(), ConfigError> {
    if name.to_lowercase() == ALL_ZONES {
        return Err(ConfigError::ReservedName(name.to_string()));
    }
    if name.contains(['/', '\\']) {
        return Err(ConfigError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn empty_zone_warnings(zone_index: &ZoneIndexVolume, zones: &IndexMap<String, u32>) -> Vec<Diagnostic> {
    zones
        .iter()
        .filter(|&(_, &number)| !zone_index.iter().any(|&z| z == number))
        .map(|(name, number)| Diagnostic::warning(format!("Zone '{name}' ({number}) has no cells")))
        .collect()
}
