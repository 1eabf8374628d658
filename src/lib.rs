//! `grd3d-maps` library crate.
//!
//! The binary (`grd3d`) is a thin wrapper around this library so that:
//!
//! - the pipelines are testable without spawning processes
//! - the engine (zonation, derived volumes, aggregation) is reusable without the CLI
//! - file formats stay isolated in `io`

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod report;
