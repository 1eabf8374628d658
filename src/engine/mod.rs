//! Zonation, derived properties and vertical aggregation.
//!
//! Responsibilities:
//!
//! - resolve the zone-index volume and zone dictionaries (`zonation`)
//! - derive migration-time and phase-mass volumes (`migration`, `mass`)
//! - collapse volumes into per-zone 2D maps (`aggregate`)
//!
//! Nothing in here touches the filesystem or logs; recoverable conditions are
//! returned as `Diagnostic`s.

pub mod aggregate;
pub mod mass;
pub mod migration;
pub mod zonation;

pub use aggregate::{MapRequest, aggregate, aggregate_many};
pub use mass::{MassPhase, MassTranslator, PhaseMassTranslator};
pub use migration::{TrackedProperty, compute_migration_time, select_tracked};
pub use zonation::{ALL_ZONES, MergedZones, ResolvedZonation, ZoneCodeLoader, resolve};
