//! Formatted terminal output.
//!
//! Formatting lives here so the pipelines only return data.

use std::path::Path;

use crate::engine::ResolvedZonation;
use crate::report::{MapStats, ZoneStats, zone_stats};

/// Format the zonation section: zones with their cell counts, then super-zones.
pub fn format_zonation(zonation: &ResolvedZonation) -> String {
    let mut out = String::new();
    let stats = zone_stats(zonation);

    if stats.is_empty() {
        out.push_str("Zones: none (whole grid only)\n");
    } else {
        out.push_str("Zones:\n");
        for ZoneStats { name, number, cells } in &stats {
            out.push_str(&format!("  {number:>3} {name:<16} cells={cells}\n"));
        }
    }

    if !zonation.superzones.is_empty() {
        out.push_str("Super-zones:\n");
        for (name, members) in &zonation.superzones {
            let members: Vec<String> = members.iter().map(u32::to_string).collect();
            out.push_str(&format!("  {name:<20} [{}]\n", members.join(", ")));
        }
    }

    out
}

/// Format one line per written map.
pub fn format_maps(maps: &[MapStats]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Maps written: {}\n", maps.len()));
    for m in maps {
        let file = m
            .file
            .file_name()
            .map(Path::new)
            .unwrap_or(m.file.as_path())
            .to_string_lossy();
        out.push_str(&format!(
            "  {file:<48} defined={}/{} range=[{}, {}]\n",
            m.defined,
            m.total,
            fmt_opt(m.min),
            fmt_opt(m.max)
        ));
    }
    out
}

/// Format the full run summary.
pub fn format_run_summary(title: &str, zonation: &ResolvedZonation, maps: &[MapStats]) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== grd3d - {title} ===\n"));
    out.push_str(&format_zonation(zonation));
    out.push('\n');
    out.push_str(&format_maps(maps));
    out
}

fn fmt_opt(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.6}")).unwrap_or_else(|| "-".to_string())
}
