//! Grid JSON read/write.
//!
//! ```json
//! {"nx": 2, "ny": 3, "nz": 4, "actnum": [1, 1, 0, ...]}
//! ```
//!
//! `actnum` is optional (all cells active) and, like every flat array in this
//! crate, is stored in `(i, j, k)` order with `k` varying fastest.

use std::fs::File;
use std::path::Path;

use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::domain::Grid;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridFile {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actnum: Option<Vec<u8>>,
}

impl GridFile {
    pub fn into_grid(self) -> Result<Grid, String> {
        let dims = (self.nx, self.ny, self.nz);
        let Some(actnum) = self.actnum else {
            return Ok(Grid::new(self.nx, self.ny, self.nz));
        };
        let expected = self.nx * self.ny * self.nz;
        if actnum.len() != expected {
            return Err(format!(
                "actnum has {} entries, expected nx*ny*nz = {expected}",
                actnum.len()
            ));
        }
        let mask = actnum.into_iter().map(|a| a != 0).collect();
        Array3::from_shape_vec(dims, mask)
            .map(Grid::with_actnum)
            .map_err(|e| format!("Invalid actnum shape: {e}"))
    }

    pub fn from_grid(grid: &Grid) -> Self {
        let (nx, ny, nz) = grid.dimensions();
        Self {
            nx,
            ny,
            nz,
            actnum: Some(grid.actnum().iter().map(|&a| u8::from(a)).collect()),
        }
    }
}

/// Read a grid JSON file.
pub fn read_grid(path: &Path) -> Result<Grid, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open grid '{}': {e}", path.display())))?;
    let raw: GridFile = serde_json::from_reader(file)
        .map_err(|e| AppError::new(2, format!("Invalid grid JSON '{}': {e}", path.display())))?;
    raw.into_grid()
        .map_err(|e| AppError::new(2, format!("Invalid grid '{}': {e}", path.display())))
}

/// Write a grid JSON file.
pub fn write_grid(path: &Path, grid: &Grid) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create grid '{}': {e}", path.display())))?;
    serde_json::to_writer(file, &GridFile::from_grid(grid))
        .map_err(|e| AppError::new(4, format!("Failed to write grid JSON: {e}")))
}
