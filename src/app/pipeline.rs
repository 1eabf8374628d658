//! Shared pipeline logic for the three subcommands.
//!
//! Every run follows the same shape:
//! config checks -> grid + zonation -> derived volumes -> per-zone maps -> CSV
//!
//! The functions here return data only; printing and logging of diagnostics
//! happen in `app`.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::{ComputeSettings, RootConfig, substitute_eclroot};
use crate::domain::{AggregationMethod, Diagnostic, Grid, PropertyVolume, ZoneSelector};
use crate::engine::mass::{OPTIONAL_DYNAMIC_PROPERTIES, REQUIRED_DYNAMIC_PROPERTIES, STATIC_PROPERTIES};
use crate::engine::{
    MapRequest, MassTranslator, PhaseMassTranslator, ResolvedZonation, aggregate_many, compute_migration_time,
    resolve, select_tracked,
};
use crate::error::{AppError, ConfigError};
use crate::io::{PropertyBundle, extract_series, load_zone_codes, output_file_name, read_grid, write_map_csv};
use crate::report::{MapStats, map_stats};

/// File name of the migration-time bundle saved under `output.gridfolder`.
pub const MIGRATION_TIME_BUNDLE: &str = "migrationtime.json";

/// File name of the phase-mass bundle saved under `output.gridfolder`.
pub const MASS_BUNDLE: &str = "co2-mass.json";

/// Grid and zonation shared by every pipeline.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub grid: Grid,
    pub zonation: ResolvedZonation,
}

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub zonation: ResolvedZonation,
    pub maps: Vec<MapStats>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Read the grid and resolve the zonation.
pub fn prepare(config: &RootConfig) -> Result<Prepared, AppError> {
    let grid_path = source_path(config, &config.input.grid)?;
    let grid = read_grid(&grid_path)?;
    let (nx, ny, nz) = grid.dimensions();
    debug!("grid {nx}x{ny}x{nz} with {} active cells", grid.active_count());

    let zonation = resolve(&config.zonation, config.input.eclroot.as_deref(), &grid, &load_zone_codes)?;
    info!("resolved {} zones, {} super-zones", zonation.zones.len(), zonation.superzones.len());
    Ok(Prepared { grid, zonation })
}

/// Aggregate every configured property into maps.
///
/// A property group without names aggregates every property in its source.
pub fn run_aggregate(config: &RootConfig) -> Result<RunOutput, AppError> {
    if config.input.properties.is_empty() {
        return Err(AppError::new(2, "Aggregation needs at least one input property"));
    }
    let prepared = prepare(config)?;

    let mut volumes = Vec::new();
    for spec in &config.input.properties {
        let path = source_path(config, &spec.source)?;
        let bundle = PropertyBundle::read(&path, &prepared.grid)?;
        let names = match spec.names() {
            names if names.is_empty() => bundle.names(),
            names => names,
        };
        for name in &names {
            volumes.extend(bundle.select(name, &config.input.dates)?);
        }
    }
    debug!("aggregating {} property volumes", volumes.len());

    finish(
        config,
        prepared,
        &volumes,
        config.computesettings.aggregation,
        config.output.aggregation_tag,
        Vec::new(),
    )
}

/// Compute phase masses and write summed maps.
pub fn run_mass(config: &RootConfig) -> Result<RunOutput, AppError> {
    if !config.input.properties.is_empty() {
        return Err(ConfigError::MassWithProperties.into());
    }
    let settings = config
        .co2_mass_settings
        .as_ref()
        .ok_or(ConfigError::MissingMassSettings)?;
    let prepared = prepare(config)?;
    let mut diagnostics = Vec::new();

    let init = PropertyBundle::read(&source_path(config, &settings.init_source)?, &prepared.grid)?;
    let mut statics = Vec::new();
    for name in STATIC_PROPERTIES {
        statics.extend(init.select(name, &[])?);
    }

    let unrst = PropertyBundle::read(&source_path(config, &settings.unrst_source)?, &prepared.grid)?;
    let mut names: Vec<&str> = REQUIRED_DYNAMIC_PROPERTIES.to_vec();
    for name in OPTIONAL_DYNAMIC_PROPERTIES {
        if unrst.contains(name) {
            names.push(name);
        } else {
            diagnostics.push(Diagnostic::info(format!(
                "{name} not found in restart source; using its default"
            )));
        }
    }
    let series = extract_series(&unrst, &names, &config.input.dates)?;

    let translator = PhaseMassTranslator::new(settings.maps.as_deref());
    let volumes: Vec<PropertyVolume> = translator
        .translate(&prepared.grid, &statics, &series)?
        .into_iter()
        .flatten()
        .collect();
    info!("computed {} phase-mass volumes over {} dates", volumes.len(), series.len());

    save_volumes(config, MASS_BUNDLE, &volumes)?;
    finish(config, prepared, &volumes, AggregationMethod::Sum, false, diagnostics)
}

/// Compute the migration-time volume and write minimum maps.
pub fn run_migration_time(config: &RootConfig) -> Result<RunOutput, AppError> {
    let spec = match config.input.properties.as_slice() {
        [] => return Err(ConfigError::NoPropertyGroup.into()),
        [spec] => spec,
        _ => return Err(ConfigError::MultiplePropertyGroups.into()),
    };
    let (tracked, diagnostics) = select_tracked(&spec.names(), spec.lower_threshold.as_ref())?;
    let prepared = prepare(config)?;

    let bundle = PropertyBundle::read(&source_path(config, &spec.source)?, &prepared.grid)?;
    let names: Vec<&str> = tracked.iter().map(|t| t.name.as_str()).collect();
    let series = extract_series(&bundle, &names, &config.input.dates)?;
    let volume = compute_migration_time(&prepared.grid, &series, &tracked)?;
    info!("migration time computed from {} dates", series.len());

    let volumes = [volume];
    save_volumes(config, MIGRATION_TIME_BUNDLE, &volumes)?;
    finish(config, prepared, &volumes, AggregationMethod::Min, false, diagnostics)
}

/// Zones to map, in merged-dictionary order.
pub fn selected_zones<'a>(settings: &ComputeSettings, zonation: &'a ResolvedZonation) -> Vec<(&'a str, &'a ZoneSelector)> {
    zonation
        .merged
        .iter()
        .filter(|(_, selector)| if selector.is_all() { settings.all } else { settings.zone })
        .collect()
}

fn finish(
    config: &RootConfig,
    prepared: Prepared,
    volumes: &[PropertyVolume],
    method: AggregationMethod,
    aggregation_tag: bool,
    mut diagnostics: Vec<Diagnostic>,
) -> Result<RunOutput, AppError> {
    let Prepared { grid, zonation } = prepared;
    let zones = selected_zones(&config.computesettings, &zonation);
    if zones.is_empty() {
        diagnostics.push(Diagnostic::warning(
            "No zones selected (computesettings.all and computesettings.zone are both off); no maps written",
        ));
    }

    let requests: Vec<MapRequest<'_>> = volumes
        .iter()
        .flat_map(|property| {
            zones.iter().map(move |&(zone_name, selector)| MapRequest {
                zone_name,
                selector,
                property,
            })
        })
        .collect();
    check_output_names(&requests, method, aggregation_tag)?;
    let maps = aggregate_many(&grid, &zonation.zone_index, &requests, method)?;

    let mut written = Vec::with_capacity(maps.len());
    for map in &maps {
        let path = write_map_csv(&config.output.mapfolder, map, aggregation_tag)?;
        debug!("wrote {}", path.display());
        written.push(map_stats(map, &path));
    }

    let mut all_diagnostics = zonation.diagnostics.clone();
    all_diagnostics.extend(diagnostics);
    Ok(RunOutput {
        zonation,
        maps: written,
        diagnostics: all_diagnostics,
    })
}

/// Every request must map to its own file inside the map folder.
fn check_output_names(
    requests: &[MapRequest<'_>],
    method: AggregationMethod,
    aggregation_tag: bool,
) -> Result<(), ConfigError> {
    let mut targets = HashSet::with_capacity(requests.len());
    for req in requests {
        let property = req.property;
        if property.name.contains(['/', '\\']) {
            return Err(ConfigError::InvalidName(property.name.clone()));
        }
        let name = output_file_name(req.zone_name, method, &property.name, property.date, aggregation_tag);
        if !targets.insert(name.clone()) {
            return Err(ConfigError::DuplicateMapOutput(name));
        }
    }
    Ok(())
}

/// Save derived volumes under `output.gridfolder`, if configured.
fn save_volumes(config: &RootConfig, file_name: &str, volumes: &[PropertyVolume]) -> Result<(), AppError> {
    let Some(folder) = &config.output.gridfolder else {
        return Ok(());
    };
    fs::create_dir_all(folder)
        .map_err(|e| AppError::new(4, format!("Failed to create grid folder '{}': {e}", folder.display())))?;
    let path = folder.join(file_name);
    PropertyBundle::from_volumes(volumes.to_vec()).write(&path)?;
    info!("saved derived volumes to {}", path.display());
    Ok(())
}

fn source_path(config: &RootConfig, source: &str) -> Result<PathBuf, AppError> {
    let path = substitute_eclroot(source, config.input.eclroot.as_deref())?;
    if !path.exists() {
        return Err(AppError::new(2, format!("Input file not found: '{}'", path.display())));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::io::write_grid;
    use chrono::NaiveDate;
    use ndarray::Array3;
    use std::path::Path;

    /// Fresh directory holding a 2x1x4 grid (last layer of column 2 inactive).
    fn workspace(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("grd3d-pipeline-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        let mut actnum = Array3::from_elem((2, 1, 4), true);
        actnum[[1, 0, 3]] = false;
        write_grid(&dir.join("grid.json"), &Grid::with_actnum(actnum)).unwrap();
        dir
    }

    fn date(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn volume(name: &str, d: Option<NaiveDate>, values: [f64; 8]) -> PropertyVolume {
        PropertyVolume::new(name, d, Array3::from_shape_vec((2, 1, 4), values.to_vec()).unwrap())
    }

    fn config(dir: &Path, body: &str) -> RootConfig {
        let text = format!(
            r#"{{
                "input": {{"eclroot": "{root}", "grid": "$eclroot/grid.json" {body_input}}},
                "zonation": {{"zranges": [{{"Top": [1, 2]}}, {{"Bottom": [3, 4]}}]}},
                "computesettings": {{"zone": true}},
                "output": {{"mapfolder": "{root}/maps", "gridfolder": "{root}/grids"}}
                {body_rest}
            }}"#,
            root = dir.display(),
            body_input = body.split('|').next().unwrap_or(""),
            body_rest = body.split('|').nth(1).unwrap_or(""),
        );
        parse_config(&text).unwrap()
    }

    fn read_csv(dir: &Path, name: &str) -> String {
        fs::read_to_string(dir.join("maps").join(name)).unwrap()
    }

    #[test]
    fn aggregate_writes_tagged_maps_per_zone_and_date() {
        let dir = workspace("aggregate");
        PropertyBundle::from_volumes(vec![
            volume("SGAS", Some(date(2020)), [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]),
            volume("SGAS", Some(date(2030)), [0.0; 8]),
        ])
        .write(&dir.join("props.json"))
        .unwrap();

        let cfg = config(
            &dir,
            r#", "properties": [{"source": "$eclroot/props.json", "name": "SGAS"}], "dates": ["20200101"]|"#,
        );
        let out = run_aggregate(&cfg).unwrap();

        // all + Top + Bottom for a single date
        assert_eq!(out.maps.len(), 3);
        assert_eq!(read_csv(&dir, "all--max_sgas--20200101.csv"), "ix,iy,value\n1,1,0.4\n2,1,0.7\n");
        assert_eq!(read_csv(&dir, "top--max_sgas--20200101.csv"), "ix,iy,value\n1,1,0.2\n2,1,0.6\n");
        assert!(out.diagnostics.is_empty());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn superzone_differing_only_in_case_is_rejected_before_writing() {
        let dir = workspace("case-collision");
        PropertyBundle::from_volumes(vec![volume("P", None, [1.0, 5.0, 0.0, 0.0, 1.0, 5.0, 0.0, 0.0])])
            .write(&dir.join("props.json"))
            .unwrap();
        let text = format!(
            r#"{{
                "input": {{"grid": "{root}/grid.json",
                           "properties": [{{"source": "{root}/props.json", "name": "P"}}]}},
                "zonation": {{"zranges": [{{"Upper": [1, 1]}}, {{"Lower": [2, 2]}}],
                             "superranges": [{{"UPPER": ["Lower"]}}]}},
                "computesettings": {{"aggregation": "sum", "zone": true}},
                "output": {{"mapfolder": "{root}/maps"}}
            }}"#,
            root = dir.display(),
        );
        let cfg = parse_config(&text).unwrap();

        let err = run_aggregate(&cfg).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), ConfigError::SuperzoneCollision("UPPER".to_string()).to_string());
        assert!(!dir.join("maps").exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn maps_sharing_a_file_name_are_rejected() {
        let dir = workspace("duplicate-targets");
        PropertyBundle::from_volumes(vec![volume("SGAS", Some(date(2020)), [0.5; 8])])
            .write(&dir.join("props.json"))
            .unwrap();
        PropertyBundle::from_volumes(vec![volume("a/b", None, [0.5; 8])])
            .write(&dir.join("nested.json"))
            .unwrap();

        let twice = config(
            &dir,
            r#", "properties": [{"source": "$eclroot/props.json", "name": "SGAS"},
                                {"source": "$eclroot/props.json", "name": "SGAS"}]|"#,
        );
        let err = run_aggregate(&twice).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.to_string(),
            ConfigError::DuplicateMapOutput("top--max_sgas--20200101.csv".to_string()).to_string()
        );
        assert!(!dir.join("maps").exists());

        let escaping = config(&dir, r#", "properties": [{"source": "$eclroot/nested.json"}]|"#);
        assert_eq!(
            run_aggregate(&escaping).unwrap_err().to_string(),
            ConfigError::InvalidName("a/b".to_string()).to_string()
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn migration_time_drops_unsupported_names_and_uses_min() {
        let dir = workspace("migration");
        PropertyBundle::from_volumes(vec![
            volume("SGAS", Some(date(2020)), [0.0, 0.0, 0.0, 0.9, 0.0, 0.0, 0.0, 0.0]),
            volume("SGAS", Some(date(2021)), [0.0, 0.0, 0.9, 0.9, 0.0, 0.0, 0.0, 0.0]),
        ])
        .write(&dir.join("unrst.json"))
        .unwrap();

        let cfg = config(
            &dir,
            r#", "properties": [{"source": "$eclroot/unrst.json", "name": ["SGAS", "PRESSURE"], "lower_threshold": [0.5, 1.0]}]|"#,
        );
        let out = run_migration_time(&cfg).unwrap();

        assert_eq!(out.diagnostics.len(), 1);
        assert!(out.diagnostics[0].message.contains("PRESSURE"));
        // Column 1 arrives at layer 4 in year 0, column 2 never.
        assert_eq!(read_csv(&dir, "all--migrationtime.csv"), "ix,iy,value\n1,1,0\n2,1,\n");
        let bottom = read_csv(&dir, "bottom--migrationtime.csv");
        assert!(bottom.starts_with("ix,iy,value\n1,1,0\n"));
        assert!(read_csv(&dir, "top--migrationtime.csv").ends_with("1,1,\n2,1,\n"));
        assert!(dir.join("grids").join(MIGRATION_TIME_BUNDLE).exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn migration_time_rejects_property_group_counts() {
        let dir = workspace("migration-groups");
        let two = config(
            &dir,
            r#", "properties": [{"source": "a.json", "name": "SGAS"}, {"source": "b.json", "name": "SGAS"}]|"#,
        );
        assert_eq!(
            run_migration_time(&two).unwrap_err().to_string(),
            ConfigError::MultiplePropertyGroups.to_string()
        );

        let none = config(&dir, "|");
        assert_eq!(run_migration_time(&none).unwrap_err().exit_code(), 2);

        let unsupported = config(&dir, r#", "properties": [{"source": "a.json", "name": "PRESSURE"}]|"#);
        assert_eq!(
            run_migration_time(&unsupported).unwrap_err().to_string(),
            ConfigError::NoSupportedProperties.to_string()
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn mass_sums_phases_without_tag() {
        let dir = workspace("mass");
        PropertyBundle::from_volumes(vec![volume("PORV", None, [1.0; 8])])
            .write(&dir.join("init.json"))
            .unwrap();
        PropertyBundle::from_volumes(vec![
            volume("SGAS", Some(date(2030)), [0.5; 8]),
            volume("DGAS", Some(date(2030)), [2.0; 8]),
            volume("DWAT", Some(date(2030)), [4.0; 8]),
            volume("AMFG", Some(date(2030)), [0.5; 8]),
        ])
        .write(&dir.join("unrst.json"))
        .unwrap();

        let cfg = config(
            &dir,
            r#"|, "co2_mass_settings": {"unrst_source": "$eclroot/unrst.json", "init_source": "$eclroot/init.json", "maps": ["gas"]}"#,
        );
        let out = run_mass(&cfg).unwrap();

        // gas per cell = 1 * 0.5 * 2 = 1; column 2 has one inactive cell.
        assert_eq!(
            read_csv(&dir, "all--co2-mass-gas-phase--20300101.csv"),
            "ix,iy,value\n1,1,4\n2,1,3\n"
        );
        assert_eq!(out.maps.len(), 3);
        assert!(out.diagnostics.iter().any(|d| d.message.contains("YMFG")));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn mass_config_errors_come_before_io() {
        let dir = workspace("mass-errors");
        let with_props = config(
            &dir,
            r#", "properties": [{"source": "missing.json", "name": "SGAS"}]|, "co2_mass_settings": {"unrst_source": "u", "init_source": "i"}"#,
        );
        assert_eq!(
            run_mass(&with_props).unwrap_err().to_string(),
            ConfigError::MassWithProperties.to_string()
        );
        let without_settings = config(&dir, "|");
        assert_eq!(
            run_mass(&without_settings).unwrap_err().to_string(),
            ConfigError::MissingMassSettings.to_string()
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn zone_selection_follows_compute_settings() {
        let dir = workspace("selection");
        let mut cfg = config(&dir, "|");
        let prepared = prepare(&cfg).unwrap();

        let names: Vec<&str> = selected_zones(&cfg.computesettings, &prepared.zonation)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["Top", "Bottom", "all"]);

        cfg.computesettings.zone = false;
        let names: Vec<&str> = selected_zones(&cfg.computesettings, &prepared.zonation)
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["all"]);
        fs::remove_dir_all(&dir).ok();
    }
}
