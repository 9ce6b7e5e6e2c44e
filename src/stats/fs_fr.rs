use crate::grid::Grid;
use crate::hood::Neighborhood;
use egt_common::Phenotype;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Division outcomes of the cells that fell into one (radius, frequency) bin.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FsFrBin {
    pub reproduced: u64,
    pub total: u64,
}

/// Competitor frequency around one live cell at the start of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsFrObservation {
    pub site: usize,
    pub phenotype: Phenotype,
    /// `round(frequency * 100)` for radius `1, 2, ..`.
    pub bins: Vec<u32>,
}

/// Measures every live cell against each template in `hoods` (one per radius, ascending).
///
/// The frequency is the share of occupied neighbors holding the other
/// phenotype, or 0 when no neighbor is occupied.
pub fn observe(grid: &Grid, hoods: &[Neighborhood]) -> Vec<FsFrObservation> {
    grid.occupied_sites()
        .filter_map(|site| {
            let phenotype = grid.get(site)?.phenotype;
            let bins = hoods
                .iter()
                .map(|hood| {
                    let mut competitors = 0u32;
                    let mut occupied = 0u32;
                    grid.for_each_neighbor(site, hood, |_, occupant| {
                        if let Some(other) = occupant {
                            occupied += 1;
                            if other.phenotype != phenotype {
                                competitors += 1;
                            }
                        }
                    });
                    if occupied == 0 {
                        0
                    } else {
                        (competitors as f64 / occupied as f64 * 100.0).round() as u32
                    }
                })
                .collect();
            Some(FsFrObservation { site, phenotype, bins })
        })
        .collect()
}

/// Frequency-dependent growth curves keyed by (radius, percent).
///
/// `fs` holds resistant cells binned by their sensitive-neighbor frequency;
/// `fr` holds sensitive cells binned by their resistant-neighbor frequency.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FsFrTable {
    pub fs: BTreeMap<(u32, u32), FsFrBin>,
    pub fr: BTreeMap<(u32, u32), FsFrBin>,
}

impl FsFrTable {
    /// Combines start-of-tick observations with the parent sites that divided during the tick.
    pub fn tally(observations: &[FsFrObservation], divided: &HashSet<usize>) -> Self {
        let mut table = FsFrTable::default();
        for obs in observations {
            let reproduced = divided.contains(&obs.site);
            let curve = match obs.phenotype {
                Phenotype::Resistant => &mut table.fs,
                Phenotype::Sensitive => &mut table.fr,
            };
            for (i, &bin) in obs.bins.iter().enumerate() {
                let entry = curve.entry((i as u32 + 1, bin)).or_default();
                entry.total += 1;
                if reproduced {
                    entry.reproduced += 1;
                }
            }
        }
        table
    }

    /// Flattened rows `(measure, radius, frequency, bin)`, Fs first.
    pub fn rows(&self) -> impl Iterator<Item = (&'static str, u32, f64, FsFrBin)> + '_ {
        let fs = self.fs.iter().map(|(&(r, pct), &bin)| ("Fs", r, pct as f64 / 100.0, bin));
        let fr = self.fr.iter().map(|(&(r, pct), &bin)| ("Fr", r, pct as f64 / 100.0, bin));
        fs.chain(fr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;
    use egt_common::{Coord, Dims, HoodShape};

    fn hoods(max: u32) -> Vec<Neighborhood> {
        (1..=max).map(|radius| Neighborhood::new(HoodShape::Circle { radius }, 2).unwrap()).collect()
    }

    fn grid(cells: &[(i32, i32, Phenotype)]) -> Grid {
        let mut grid = Grid::new(Dims::Planar { x: 6, y: 6 });
        for &(x, y, p) in cells {
            grid.place_at(Coord::planar(x, y), Cell::new(p, true, 0)).unwrap();
        }
        grid
    }

    #[test]
    fn frequencies_per_radius() {
        let g = grid(&[
            (2, 2, Phenotype::Resistant),
            (3, 2, Phenotype::Sensitive),
            (2, 4, Phenotype::Resistant),
            (2, 5, Phenotype::Sensitive),
        ]);
        let obs = observe(&g, &hoods(3));
        let r = obs.iter().find(|o| o.site == g.site_of(Coord::planar(2, 2)).unwrap()).unwrap();
        // r=1: one S; r=2: S and R; r=3: adds the S at distance 3
        assert_eq!(r.bins, vec![100, 50, 67]);
    }

    #[test]
    fn isolated_cell_has_zero_frequency() {
        let g = grid(&[(0, 0, Phenotype::Sensitive), (5, 5, Phenotype::Resistant)]);
        let obs = observe(&g, &hoods(2));
        assert!(obs.iter().all(|o| o.bins == vec![0, 0]));
    }

    #[test]
    fn tally_splits_fs_and_fr_and_counts_reproduction() {
        let g = grid(&[(1, 1, Phenotype::Resistant), (1, 2, Phenotype::Sensitive), (4, 4, Phenotype::Sensitive)]);
        let obs = observe(&g, &hoods(1));
        let divided: HashSet<usize> = [g.site_of(Coord::planar(1, 1)).unwrap()].into_iter().collect();
        let table = FsFrTable::tally(&obs, &divided);
        assert_eq!(table.fs[&(1, 100)], FsFrBin { reproduced: 1, total: 1 });
        assert_eq!(table.fr[&(1, 100)], FsFrBin { reproduced: 0, total: 1 });
        assert_eq!(table.fr[&(1, 0)], FsFrBin { reproduced: 0, total: 1 });
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, "Fs");
        assert_eq!(rows[0].2, 1.0);
    }
}
