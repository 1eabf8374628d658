//! Vertical aggregation of 3D volumes into 2D maps.
//!
//! Each output cell reduces one grid column. Only active cells whose zone
//! number is selected and whose value is defined take part; a column with no
//! such cell yields no-data rather than zero.

use ndarray::{Array2, Axis, Zip};
use rayon::prelude::*;

use crate::domain::{AggregationMethod, Grid, Map2D, PropertyVolume, ZoneIndexVolume, ZoneSelector};
use crate::error::EngineError;

/// Running reduction over the selected cells of one column.
#[derive(Debug, Clone, Copy)]
struct Accumulator {
    method: AggregationMethod,
    value: f64,
    count: usize,
}

impl Accumulator {
    fn new(method: AggregationMethod) -> Self {
        let value = match method {
            AggregationMethod::Max => f64::NEG_INFINITY,
            AggregationMethod::Min => f64::INFINITY,
            AggregationMethod::Sum | AggregationMethod::Mean => 0.0,
        };
        Self { method, value, count: 0 }
    }

    fn push(&mut self, v: f64) {
        self.count += 1;
        match self.method {
            AggregationMethod::Sum | AggregationMethod::Mean => self.value += v,
            AggregationMethod::Max => self.value = self.value.max(v),
            AggregationMethod::Min => self.value = self.value.min(v),
        }
    }

    fn finish(self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(match self.method {
            AggregationMethod::Mean => self.value / self.count as f64,
            AggregationMethod::Sum | AggregationMethod::Max | AggregationMethod::Min => self.value,
        })
    }
}

/// Reduce a sequence of values; `None` when the sequence is empty.
pub fn reduce(values: impl IntoIterator<Item = f64>, method: AggregationMethod) -> Option<f64> {
    let mut acc = Accumulator::new(method);
    for v in values {
        acc.push(v);
    }
    acc.finish()
}

/// Collapse `property` into a map for one zone selector.
pub fn aggregate(
    grid: &Grid,
    zone_index: &ZoneIndexVolume,
    property: &PropertyVolume,
    zone_name: &str,
    selector: &ZoneSelector,
    method: AggregationMethod,
) -> Result<Map2D, EngineError> {
    grid.check_dims("zone index", zone_index.dim())?;
    grid.check_dims(&property.name, property.dimensions())?;

    let (nx, ny, _) = grid.dimensions();
    let mut values = Array2::from_elem((nx, ny), None);

    Zip::from(&mut values)
        .and(property.values.lanes(Axis(2)))
        .and(zone_index.lanes(Axis(2)))
        .and(grid.actnum().lanes(Axis(2)))
        .for_each(|out, column, zones, active| {
            let selected = column
                .iter()
                .zip(zones.iter())
                .zip(active.iter())
                .filter(|&((v, &z), &a)| a && !v.is_nan() && selector.selects(z))
                .map(|((&v, _), _)| v);
            *out = reduce(selected, method);
        });

    Ok(Map2D {
        zone: zone_name.to_string(),
        method,
        property: property.name.clone(),
        date: property.date,
        values,
    })
}

/// One requested map: which zone and which property volume.
#[derive(Debug, Clone, Copy)]
pub struct MapRequest<'a> {
    pub zone_name: &'a str,
    pub selector: &'a ZoneSelector,
    pub property: &'a PropertyVolume,
}

/// Evaluate independent map requests in parallel, preserving request order.
pub fn aggregate_many(
    grid: &Grid,
    zone_index: &ZoneIndexVolume,
    requests: &[MapRequest<'_>],
    method: AggregationMethod,
) -> Result<Vec<Map2D>, EngineError> {
    requests
        .par_iter()
        .map(|req| aggregate(grid, zone_index, req.property, req.zone_name, req.selector, method))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// One column (1x1 grid) with three layers.
    fn column(values: [f64; 3]) -> PropertyVolume {
        PropertyVolume::new("P", None, Array3::from_shape_vec((1, 1, 3), values.to_vec()).unwrap())
    }

    fn zones(z: [u32; 3]) -> ZoneIndexVolume {
        Array3::from_shape_vec((1, 1, 3), z.to_vec()).unwrap()
    }

    fn run(prop: &PropertyVolume, zi: &ZoneIndexVolume, sel: &ZoneSelector, method: AggregationMethod) -> Option<f64> {
        let grid = Grid::new(1, 1, 3);
        aggregate(&grid, zi, prop, "z", sel, method).unwrap().get(0, 0)
    }

    #[test]
    fn reductions_over_zone() {
        let prop = column([1.0, 2.0, 3.0]);
        let zi = zones([1, 1, 1]);
        let sel = ZoneSelector::Zone(1);
        assert_eq!(run(&prop, &zi, &sel, AggregationMethod::Sum), Some(6.0));
        assert_eq!(run(&prop, &zi, &sel, AggregationMethod::Min), Some(1.0));
        assert_eq!(run(&prop, &zi, &sel, AggregationMethod::Max), Some(3.0));
        assert_eq!(run(&prop, &zi, &sel, AggregationMethod::Mean), Some(2.0));
    }

    #[test]
    fn empty_selection_is_no_data_not_zero() {
        let prop = column([1.0, 2.0, 3.0]);
        let zi = zones([1, 1, 1]);
        let sel = ZoneSelector::Zone(2);
        assert_eq!(run(&prop, &zi, &sel, AggregationMethod::Sum), None);
        assert_eq!(run(&prop, &zi, &sel, AggregationMethod::Min), None);
    }

    #[test]
    fn zone_and_superzone_selection() {
        let prop = column([1.0, 2.0, 4.0]);
        let zi = zones([1, 2, 3]);
        assert_eq!(run(&prop, &zi, &ZoneSelector::Zone(2), AggregationMethod::Sum), Some(2.0));
        let sel = ZoneSelector::SuperZone(vec![1, 3, 1]);
        // A member listed twice still counts its cells once.
        assert_eq!(run(&prop, &zi, &sel, AggregationMethod::Sum), Some(5.0));
        assert_eq!(run(&prop, &zi, &ZoneSelector::All, AggregationMethod::Sum), Some(7.0));
    }

    #[test]
    fn all_includes_unzoned_cells() {
        let prop = column([1.0, 2.0, 4.0]);
        let zi = zones([0, 0, 1]);
        assert_eq!(run(&prop, &zi, &ZoneSelector::All, AggregationMethod::Max), Some(4.0));
        assert_eq!(run(&prop, &zi, &ZoneSelector::Zone(1), AggregationMethod::Min), Some(4.0));
    }

    #[test]
    fn inactive_and_undefined_cells_are_skipped() {
        let mut actnum = Array3::from_elem((1, 1, 3), true);
        actnum[[0, 0, 0]] = false;
        let grid = Grid::with_actnum(actnum);
        let prop = column([-5.0, f64::NAN, 3.0]);
        let zi = zones([1, 1, 1]);
        let map = aggregate(&grid, &zi, &prop, "z", &ZoneSelector::All, AggregationMethod::Min).unwrap();
        assert_eq!(map.get(0, 0), Some(3.0));

        let undefined = column([-5.0, f64::NAN, f64::NAN]);
        let map = aggregate(&grid, &zi, &undefined, "z", &ZoneSelector::All, AggregationMethod::Min).unwrap();
        assert_eq!(map.get(0, 0), None);
    }

    #[test]
    fn columns_are_independent() {
        let grid = Grid::new(2, 1, 2);
        let prop = PropertyVolume::new(
            "P",
            None,
            Array3::from_shape_vec((2, 1, 2), vec![1.0, 2.0, 10.0, 20.0]).unwrap(),
        );
        let zi = Array3::from_shape_vec((2, 1, 2), vec![1, 1, 2, 2]).unwrap();
        let map = aggregate(&grid, &zi, &prop, "z", &ZoneSelector::Zone(1), AggregationMethod::Sum).unwrap();
        assert_eq!(map.get(0, 0), Some(3.0));
        assert_eq!(map.get(1, 0), None);
        assert_eq!(map.defined_count(), 1);
    }

    #[test]
    fn shape_mismatch_is_an_error() {
        let grid = Grid::new(1, 1, 4);
        let prop = column([1.0, 2.0, 3.0]);
        let zi = Array3::zeros((1, 1, 4));
        let err = aggregate(&grid, &zi, &prop, "z", &ZoneSelector::All, AggregationMethod::Sum).unwrap_err();
        assert!(matches!(err, EngineError::ShapeMismatch { .. }));
    }

    #[test]
    fn many_requests_keep_order() {
        let grid = Grid::new(1, 1, 3);
        let prop = column([1.0, 2.0, 3.0]);
        let zi = zones([1, 2, 2]);
        let z1 = ZoneSelector::Zone(1);
        let z2 = ZoneSelector::Zone(2);
        let requests = [
            MapRequest { zone_name: "one", selector: &z1, property: &prop },
            MapRequest { zone_name: "two", selector: &z2, property: &prop },
        ];
        let maps = aggregate_many(&grid, &zi, &requests, AggregationMethod::Sum).unwrap();
        assert_eq!(maps[0].zone, "one");
        assert_eq!(maps[0].get(0, 0), Some(1.0));
        assert_eq!(maps[1].zone, "two");
        assert_eq!(maps[1].get(0, 0), Some(5.0));
    }

    #[test]
    fn reduce_empty_is_none() {
        assert_eq!(reduce(std::iter::empty(), AggregationMethod::Sum), None);
        assert_eq!(reduce([2.0, 4.0], AggregationMethod::Mean), Some(3.0));
    }
}
