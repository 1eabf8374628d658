//! Phase mass volumes.
//!
//! The aggregation pipeline only needs "per phase, per date" volumes; how they
//! are computed is behind [`MassTranslator`]. [`PhaseMassTranslator`] is the
//! default implementation:
//!
//! ```text
//! gas   = PORV * SGAS * DGAS * YMFG        (YMFG = 1 when absent)
//! aqu   = PORV * (1 - SGAS) * DWAT * AMFG  (AMFG = 0 when absent)
//! total = gas + aqu
//! ```

use ndarray::{Array3, Zip};
use serde::{Deserialize, Serialize};

use crate::domain::{Grid, PropertyVolume, TimeSeries};
use crate::error::EngineError;

/// Static (initial) property needed by the default translator.
pub const STATIC_PROPERTIES: [&str; 1] = ["PORV"];

/// Dynamic properties that must exist at every date.
pub const REQUIRED_DYNAMIC_PROPERTIES: [&str; 3] = ["SGAS", "DGAS", "DWAT"];

/// Dynamic properties used when present.
pub const OPTIONAL_DYNAMIC_PROPERTIES: [&str; 2] = ["AMFG", "YMFG"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassPhase {
    Gas,
    Aqu,
    Total,
}

impl MassPhase {
    pub const ALL: [MassPhase; 3] = [MassPhase::Total, MassPhase::Aqu, MassPhase::Gas];

    pub fn property_name(self) -> &'static str {
        match self {
            MassPhase::Gas => "co2-mass-gas-phase",
            MassPhase::Aqu => "co2-mass-aqu-phase",
            MassPhase::Total => "co2-mass-total",
        }
    }
}

/// Turns raw static and dynamic volumes into per-phase mass volumes.
///
/// The result is indexed by date first, then phase.
pub trait MassTranslator {
    fn translate(
        &self,
        grid: &Grid,
        statics: &[PropertyVolume],
        series: &TimeSeries,
    ) -> Result<Vec<Vec<PropertyVolume>>, EngineError>;
}

/// Saturation and density based translator.
#[derive(Debug, Clone)]
pub struct PhaseMassTranslator {
    phases: Vec<MassPhase>,
}

impl PhaseMassTranslator {
    /// `None` or an empty list selects every phase.
    pub fn new(phases: Option<&[MassPhase]>) -> Self {
        let phases = match phases {
            Some(p) if !p.is_empty() => p.to_vec(),
            _ => MassPhase::ALL.to_vec(),
        };
        Self { phases }
    }
}

impl MassTranslator for PhaseMassTranslator {
    fn translate(
        &self,
        grid: &Grid,
        statics: &[PropertyVolume],
        series: &TimeSeries,
    ) -> Result<Vec<Vec<PropertyVolume>>, EngineError> {
        if series.is_empty() {
            return Err(EngineError::EmptyTimeSeries);
        }
        let first = *series.keys().next().ok_or(EngineError::EmptyTimeSeries)?;
        let porv = find(statics, "PORV").ok_or_else(|| EngineError::MissingProperty {
            name: "PORV".to_string(),
            date: first,
        })?;
        grid.check_dims(&porv.name, porv.dimensions())?;

        let mut out = Vec::with_capacity(series.len());
        for (date, volumes) in series {
            let required = |name: &str| {
                let v = find(volumes, name).ok_or_else(|| EngineError::MissingProperty {
                    name: name.to_string(),
                    date: *date,
                })?;
                grid.check_dims(&v.name, v.dimensions())?;
                Ok::<_, EngineError>(v)
            };
            let sgas = required("SGAS")?;
            let dgas = required("DGAS")?;
            let dwat = required("DWAT")?;
            let amfg = find(volumes, "AMFG");
            let ymfg = find(volumes, "YMFG");
            for v in amfg.iter().chain(ymfg.iter()) {
                grid.check_dims(&v.name, v.dimensions())?;
            }

            let mut gas = &porv.values * &sgas.values * &dgas.values;
            if let Some(ymfg) = ymfg {
                gas *= &ymfg.values;
            }
            let mut aqu = &porv.values * &sgas.values.mapv(|s| 1.0 - s) * &dwat.values;
            match amfg {
                Some(amfg) => aqu *= &amfg.values,
                None => aqu.fill(0.0),
            }
            mask_inactive(&mut gas, grid);
            mask_inactive(&mut aqu, grid);

            let phases = self
                .phases
                .iter()
                .map(|&phase| {
                    let values = match phase {
                        MassPhase::Gas => gas.clone(),
                        MassPhase::Aqu => aqu.clone(),
                        MassPhase::Total => &gas + &aqu,
                    };
                    PropertyVolume::new(phase.property_name(), Some(*date), values)
                })
                .collect();
            out.push(phases);
        }
        Ok(out)
    }
}

fn find<'a>(volumes: &'a [PropertyVolume], name: &str) -> Option<&'a PropertyVolume> {
    volumes.iter().find(|v| v.name == name)
}

fn mask_inactive(values: &mut Array3<f64>, grid: &Grid) {
    Zip::from(values).and(grid.actnum()).for_each(|v, &active| {
        if !active {
            *v = f64::NAN;
        }
    });
}
