//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the grid descriptor and dense volumes (`Grid`, `PropertyVolume`, `ZoneIndexVolume`)
//! - zone selection and aggregation enums (`ZoneSelector`, `AggregationMethod`)
//! - map outputs (`Map2D`) and engine diagnostics (`Diagnostic`)

pub mod types;

pub use types::*;
