//! Typed configuration schema.
//!
//! Every section rejects unknown keys, so a misspelled option fails at load
//! time instead of being silently ignored.

use std::path::PathBuf;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::domain::AggregationMethod;
use crate::engine::mass::MassPhase;
use crate::error::ConfigError;

/// Placeholder token substituted with `input.eclroot` inside source paths.
pub const ECLROOT_TOKEN: &str = "$eclroot";

/// Default lower threshold for migration time when none is configured.
pub const DEFAULT_LOWER_THRESHOLD: f64 = 0.0001;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootConfig {
    pub input: Input,
    #[serde(default)]
    pub zonation: Zonation,
    #[serde(default)]
    pub computesettings: ComputeSettings,
    pub output: Output,
    #[serde(default)]
    pub co2_mass_settings: Option<Co2MassSettings>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Input {
    pub grid: String,
    #[serde(default)]
    pub properties: Vec<PropertySpec>,
    #[serde(default, deserialize_with = "deserialize_dates")]
    pub dates: Vec<NaiveDate>,
    #[serde(default)]
    pub eclroot: Option<String>,
}

/// One property group: a source bundle plus the property name(s) read from it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertySpec {
    pub source: String,
    #[serde(default)]
    pub name: Option<OneOrMany<String>>,
    #[serde(default)]
    pub lower_threshold: Option<Threshold>,
}

impl PropertySpec {
    pub fn names(&self) -> Vec<String> {
        self.name.clone().map(OneOrMany::into_vec).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Migration-time threshold: one value for all properties or one per name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Scalar(f64),
    PerProperty(Vec<f64>),
}

/// A single-key mapping such as `{"Upper": [1, 5]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Named<T> {
    pub name: String,
    pub value: T,
}

impl<T> Named<T> {
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl<T> TryFrom<IndexMap<String, T>> for Named<T> {
    type Error = ConfigError;

    fn try_from(map: IndexMap<String, T>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(ConfigError::NotSingleKey(map.len()));
        }
        let (name, value) = map.into_iter().next().ok_or(ConfigError::NotSingleKey(0))?;
        Ok(Self { name, value })
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Named<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = IndexMap::<String, T>::deserialize(deserializer)?;
        Named::try_from(map).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Zonation {
    #[serde(default)]
    pub zproperty: Option<ZProperty>,
    #[serde(default)]
    pub zranges: Option<Vec<Named<[usize; 2]>>>,
    #[serde(default)]
    pub superranges: Vec<Named<Vec<String>>>,
}

/// Zonation taken from an integer-coded property volume.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ZProperty {
    pub source: String,
    pub name: String,
    pub zones: Vec<Named<Vec<i64>>>,
}

/// Which of the two mutually exclusive zonation inputs is configured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZonationMode<'a> {
    None,
    Ranges(&'a [Named<[usize; 2]>]),
    Property(&'a ZProperty),
}

impl Zonation {
    pub fn mode(&self) -> Result<ZonationMode<'_>, ConfigError> {
        match (&self.zproperty, &self.zranges) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingZonation),
            (Some(zprop), None) => Ok(ZonationMode::Property(zprop)),
            (None, Some(ranges)) => Ok(ZonationMode::Ranges(ranges)),
            (None, None) => Ok(ZonationMode::None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComputeSettings {
    #[serde(default = "default_aggregation")]
    pub aggregation: AggregationMethod,
    /// Produce the whole-grid (`"all"`) map.
    #[serde(default = "default_true")]
    pub all: bool,
    /// Produce one map per zone and super-zone.
    #[serde(default)]
    pub zone: bool,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            aggregation: default_aggregation(),
            all: true,
            zone: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Output {
    pub mapfolder: PathBuf,
    #[serde(default = "default_true")]
    pub aggregation_tag: bool,
    /// Where derived 3D volumes (migration time, phase masses) are saved.
    #[serde(default)]
    pub gridfolder: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Co2MassSettings {
    pub unrst_source: String,
    pub init_source: String,
    #[serde(default)]
    pub maps: Option<Vec<MassPhase>>,
}

fn default_aggregation() -> AggregationMethod {
    AggregationMethod::Max
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DateValue {
    Number(u32),
    Text(String),
}

fn deserialize_dates<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<NaiveDate>, D::Error> {
    let raw = Vec::<DateValue>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|v| {
            let text = match v {
                DateValue::Number(n) => n.to_string(),
                DateValue::Text(s) => s,
            };
            parse_date(&text).map_err(serde::de::Error::custom)
        })
        .collect()
}

/// Parse a date in one of the accepted formats.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    // Simulator restart dates are usually written as `YYYYMMDD`; ISO dates are
    // accepted as well.
    const FMTS: [&str; 3] = ["%Y%m%d", "%Y-%m-%d", "%Y/%m/%d"];
    let s = s.trim();
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYYMMDD, YYYY-MM-DD, YYYY/MM/DD."
    ))
}
