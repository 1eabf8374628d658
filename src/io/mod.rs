//! Input/output helpers.
//!
//! - grid JSON read/write (`grid`)
//! - property bundles and series extraction (`property`)
//! - map CSV export (`maps`)

pub mod grid;
pub mod maps;
pub mod property;

pub use grid::*;
pub use maps::*;
pub use property::*;
