use egt_common::{Dims, DistanceMetric, Result, SimError};
use log::debug;
use rayon::prelude::*;
use std::time::Instant;

/// In-bounds site counts keyed by (site, distance) for one grid geometry and metric.
///
/// Entry `(s, d)` is the number of other sites whose distance from `s` is
/// exactly `d`. Built by exhaustive enumeration of site pairs; depends only on
/// the geometry, so a model builds it once and reuses it for every sample.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnulusTable {
    dims: Dims,
    metric: DistanceMetric,
    max_distance: u32,
    // Site-major rows of `max_distance + 1` counts.
    counts: Vec<u32>,
}

impl AnnulusTable {
    pub fn build(dims: Dims, metric: DistanceMetric) -> Result<Self> {
        if !dims.is_spatial() {
            return Err(SimError::config("annulus table needs a spatial grid"));
        }
        let start = Instant::now();
        let capacity = dims.capacity();
        let max_distance = metric.max_distance(&dims);
        let width = max_distance as usize + 1;
        let coords: Vec<_> = (0..capacity).filter_map(|s| dims.coord_of(s)).collect();

        let rows: Vec<Vec<u32>> = coords
            .par_iter()
            .enumerate()
            .map(|(s, &origin)| {
                let mut row = vec![0u32; width];
                for (t, &other) in coords.iter().enumerate() {
                    if s != t {
                        row[metric.distance(origin, other) as usize] += 1;
                    }
                }
                row
            })
            .collect();

        let counts = rows.concat();
        debug!(
            "built {} annulus table for {} sites (max distance {max_distance}) in {:?}",
            metric.label(),
            capacity,
            start.elapsed()
        );
        Ok(AnnulusTable { dims, metric, max_distance, counts })
    }

    pub fn dims(&self) -> &Dims {
        &self.dims
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn max_distance(&self) -> u32 {
        self.max_distance
    }

    /// Sites at exactly `distance` from `site`; zero beyond the grid.
    #[inline(always)]
    pub fn count(&self, site: usize, distance: u32) -> u32 {
        if distance > self.max_distance {
            return 0;
        }
        let width = self.max_distance as usize + 1;
        self.counts.get(site * width + distance as usize).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egt_common::Coord;

    #[test]
    fn corner_has_fewer_sites_than_interior() {
        let dims = Dims::Planar { x: 9, y: 9 };
        let table = AnnulusTable::build(dims, DistanceMetric::Manhattan).unwrap();
        let corner = dims.index_of(Coord::planar(0, 0)).unwrap();
        let centre = dims.index_of(Coord::planar(4, 4)).unwrap();
        assert_eq!(table.count(corner, 1), 2);
        assert_eq!(table.count(centre, 1), 4);
        assert_eq!(table.count(centre, 2), 8);
        assert_eq!(table.count(corner, 0), 0);
        assert_eq!(table.count(corner, 16), 1);
        assert_eq!(table.count(corner, 17), 0);
    }

    #[test]
    fn rows_cover_every_other_site() {
        let dims = Dims::Volumetric { x: 3, y: 4, z: 2 };
        for metric in [DistanceMetric::Manhattan, DistanceMetric::Euclidean] {
            let table = AnnulusTable::build(dims, metric).unwrap();
            for s in 0..dims.capacity() {
                let total: u32 = (0..=table.max_distance()).map(|d| table.count(s, d)).sum();
                assert_eq!(total as usize, dims.capacity() - 1);
            }
        }
    }

    #[test]
    fn rejects_well_mixed_grid() {
        assert!(AnnulusTable::build(Dims::WellMixed { capacity: 10 }, DistanceMetric::Manhattan).is_err());
    }
}
