//! Write 2D maps to CSV.
//!
//! One file per map: `{zone}--{method_}{property}[--{YYYYMMDD}].csv`, all
//! lower case, with columns `ix,iy,value` (1-based indices, empty value for
//! no-data columns).

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::domain::{AggregationMethod, Map2D};
use crate::error::AppError;

/// File name for a map. `aggregation_tag` adds the method in front of the property.
pub fn map_file_name(map: &Map2D, aggregation_tag: bool) -> String {
    output_file_name(&map.zone, map.method, &map.property, map.date, aggregation_tag)
}

/// File name for a map that has not been computed yet.
pub fn output_file_name(
    zone: &str,
    method: AggregationMethod,
    property: &str,
    date: Option<NaiveDate>,
    aggregation_tag: bool,
) -> String {
    let tag = if aggregation_tag {
        format!("{}_", method.tag())
    } else {
        String::new()
    };
    let date = date
        .map(|d| format!("--{}", d.format("%Y%m%d")))
        .unwrap_or_default();
    format!("{zone}--{tag}{property}{date}.csv").to_lowercase()
}

/// Write one map into `folder`, creating the folder if needed.
pub fn write_map_csv(folder: &Path, map: &Map2D, aggregation_tag: bool) -> Result<PathBuf, AppError> {
    fs::create_dir_all(folder)
        .map_err(|e| AppError::new(4, format!("Failed to create map folder '{}': {e}", folder.display())))?;
    let path = folder.join(map_file_name(map, aggregation_tag));

    let mut writer = csv::Writer::from_path(&path)
        .map_err(|e| AppError::new(4, format!("Failed to create map CSV '{}': {e}", path.display())))?;
    writer
        .write_record(["ix", "iy", "value"])
        .map_err(|e| AppError::new(4, format!("Failed to write map CSV header: {e}")))?;

    for ((i, j), value) in map.values.indexed_iter() {
        let value = value.map(|v| v.to_string()).unwrap_or_default();
        writer
            .write_record([(i + 1).to_string(), (j + 1).to_string(), value])
            .map_err(|e| AppError::new(4, format!("Failed to write map CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush map CSV '{}': {e}", path.display())))?;

    Ok(path)
}
