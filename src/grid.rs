use crate::cell::Cell;
use crate::hood::Neighborhood;
use crate::rng::SimRng;
use egt_common::{CellRecord, Coord, Dims, Population, Result, SimError};

/// Which neighbors a query keeps.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SiteKind {
    Occupied,
    Empty,
}

/// Dense lattice holding at most one cell per site.
///
/// Sites are addressed by their linear index (see [`Dims::index_of`]). A
/// well-mixed grid has the same slot storage but no geometry: neighborhood
/// queries on it return nothing and offspring go to any free slot.
#[derive(Debug, Clone)]
pub struct Grid {
    dims: Dims,
    sites: Vec<Option<Cell>>,
    population: Population,
    // Free-slot stack for well-mixed placement. May hold stale (occupied) entries.
    vacant: Vec<usize>,
}

impl Grid {
    pub fn new(dims: Dims) -> Self {
        let capacity = dims.capacity();
        let vacant = if dims.is_spatial() { Vec::new() } else { (0..capacity).rev().collect() };
        Grid { dims, sites: vec![None; capacity], population: Population::default(), vacant }
    }

    pub fn dims(&self) -> &Dims {
        &self.dims
    }

    pub fn capacity(&self) -> usize {
        self.sites.len()
    }

    pub fn population(&self) -> Population {
        self.population
    }

    pub fn is_full(&self) -> bool {
        self.population.total() >= self.capacity()
    }

    #[inline(always)]
    pub fn get(&self, site: usize) -> Option<&Cell> {
        self.sites.get(site).and_then(|s| s.as_ref())
    }

    pub fn at(&self, coord: Coord) -> Option<&Cell> {
        self.dims.index_of(coord).and_then(|idx| self.get(idx))
    }

    pub fn site_of(&self, coord: Coord) -> Result<usize> {
        self.dims.index_of(coord).ok_or(SimError::OutOfBounds { coord })
    }

    /// Puts `cell` on an empty in-bounds site.
    pub fn place(&mut self, site: usize, cell: Cell) -> Result<()> {
        let coord = self.dims.describe(site);
        let slot = self.sites.get_mut(site).ok_or(SimError::OutOfBounds { coord })?;
        if slot.is_some() {
            return Err(SimError::OccupiedSite { coord });
        }
        *slot = Some(cell);
        self.population.add(cell.phenotype);
        Ok(())
    }

    pub fn place_at(&mut self, coord: Coord, cell: Cell) -> Result<usize> {
        let site = self.site_of(coord)?;
        self.place(site, cell)?;
        Ok(site)
    }

    /// Puts `cell` on any free slot of a well-mixed grid, returning the slot or
    /// `None` when it is full. Spatial grids only place by site, so this is
    /// always `None` there.
    pub fn place_anywhere(&mut self, cell: Cell) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        while let Some(site) = self.vacant.pop() {
            if self.sites[site].is_none() {
                self.place(site, cell).ok()?;
                return Some(site);
            }
        }
        None
    }

    /// Vacates a site immediately and returns its cell.
    pub fn remove(&mut self, site: usize) -> Result<Cell> {
        let coord = self.dims.describe(site);
        let slot = self.sites.get_mut(site).ok_or(SimError::OutOfBounds { coord })?;
        let cell = slot.take().ok_or(SimError::EmptySite { coord })?;
        self.population.remove(cell.phenotype);
        if !self.dims.is_spatial() {
            self.vacant.push(site);
        }
        Ok(cell)
    }

    pub fn remove_at(&mut self, coord: Coord) -> Result<Cell> {
        let site = self.site_of(coord)?;
        self.remove(site)
    }

    /// Applies the template offsets to `site` and calls `f` for every in-bounds
    /// neighbor in template order. Out-of-bounds offsets are skipped (no wraparound).
    #[inline(always)]
    pub fn for_each_neighbor<F>(&self, site: usize, hood: &Neighborhood, mut f: F)
    where
        F: FnMut(usize, Option<&Cell>),
    {
        let Some(center) = self.dims.coord_of(site) else {
            return;
        };
        for offset in hood.offsets() {
            if let Some(idx) = self.dims.index_of(center + *offset) {
                f(idx, self.sites[idx].as_ref());
            }
        }
    }

    /// Writes the neighbor sites of the requested kind into `out` (cleared first)
    /// and returns how many were found. Zero is a valid answer.
    pub fn neighbors_of_kind(&self, site: usize, hood: &Neighborhood, kind: SiteKind, out: &mut Vec<usize>) -> usize {
        out.clear();
        self.for_each_neighbor(site, hood, |idx, occupant| {
            let keep = match kind {
                SiteKind::Occupied => occupant.is_some(),
                SiteKind::Empty => occupant.is_none(),
            };
            if keep {
                out.push(idx);
            }
        });
        out.len()
    }

    pub fn occupied_sites(&self) -> impl Iterator<Item = usize> + '_ {
        self.sites.iter().enumerate().filter_map(|(idx, s)| s.as_ref().map(|_| idx))
    }

    /// All occupied sites in a fresh uniformly random order.
    pub fn shuffled_occupants(&self, rng: &mut SimRng) -> Vec<usize> {
        let mut order: Vec<usize> = self.occupied_sites().collect();
        rng.shuffle(&mut order);
        order
    }

    /// Live cells in site order.
    pub fn snapshot(&self) -> Vec<CellRecord> {
        self.snapshot_with_sites().into_iter().map(|(_, record)| record).collect()
    }

    pub fn snapshot_with_sites(&self) -> Vec<(usize, CellRecord)> {
        self.sites
            .iter()
            .enumerate()
            .filter_map(|(idx, s)| {
                s.as_ref().map(|cell| (idx, CellRecord { phenotype: cell.phenotype, coord: self.dims.coord_of(idx) }))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egt_common::{HoodShape, Phenotype};

    fn cell(phenotype: Phenotype) -> Cell {
        Cell::new(phenotype, true, 0)
    }

    fn planar(x: usize, y: usize) -> Grid {
        Grid::new(Dims::Planar { x, y })
    }

    #[test]
    fn place_rejects_occupied_and_out_of_bounds() {
        let mut grid = planar(3, 3);
        grid.place_at(Coord::planar(1, 1), cell(Phenotype::Sensitive)).unwrap();
        assert_eq!(
            grid.place_at(Coord::planar(1, 1), cell(Phenotype::Resistant)),
            Err(SimError::OccupiedSite { coord: Coord::planar(1, 1) })
        );
        assert_eq!(
            grid.place_at(Coord::planar(3, 0), cell(Phenotype::Resistant)),
            Err(SimError::OutOfBounds { coord: Coord::planar(3, 0) })
        );
        assert!(matches!(grid.place(9, cell(Phenotype::Sensitive)), Err(SimError::OutOfBounds { .. })));
        assert_eq!(grid.population(), Population { sensitive: 1, resistant: 0 });
    }

    #[test]
    fn remove_vacates_and_reports_empty() {
        let mut grid = planar(2, 2);
        let site = grid.place_at(Coord::planar(0, 1), cell(Phenotype::Resistant)).unwrap();
        assert_eq!(grid.remove(site).unwrap().phenotype, Phenotype::Resistant);
        assert!(grid.get(site).is_none());
        assert!(matches!(grid.remove(site), Err(SimError::EmptySite { .. })));
        assert!(matches!(grid.remove_at(Coord::planar(0, 1)), Err(SimError::EmptySite { .. })));
        assert!(matches!(grid.remove_at(Coord::planar(5, 1)), Err(SimError::OutOfBounds { .. })));
        assert_eq!(grid.population().total(), 0);
    }

    #[test]
    fn corner_neighbors_are_clipped_in_template_order() {
        let mut grid = planar(5, 5);
        let hood = Neighborhood::new(HoodShape::von_neumann(), 2).unwrap();
        let corner = grid.site_of(Coord::planar(0, 0)).unwrap();
        let mut out = Vec::new();

        assert_eq!(grid.neighbors_of_kind(corner, &hood, SiteKind::Empty, &mut out), 2);
        let coords: Vec<Coord> = out.iter().map(|&s| grid.dims().coord_of(s).unwrap()).collect();
        assert_eq!(coords, vec![Coord::planar(0, 1), Coord::planar(1, 0)]);

        grid.place_at(Coord::planar(1, 0), cell(Phenotype::Sensitive)).unwrap();
        assert_eq!(grid.neighbors_of_kind(corner, &hood, SiteKind::Occupied, &mut out), 1);
        assert_eq!(grid.neighbors_of_kind(corner, &hood, SiteKind::Empty, &mut out), 1);
    }

    #[test]
    fn neighborhood_relation_is_symmetric_in_bounds() {
        let grid = planar(6, 4);
        for shape in [HoodShape::Moore { radius: 2 }, HoodShape::Circle { radius: 2 }] {
            let hood = Neighborhood::new(shape, 2).unwrap();
            let mut a = Vec::new();
            let mut b = Vec::new();
            for s in 0..grid.capacity() {
                grid.neighbors_of_kind(s, &hood, SiteKind::Empty, &mut a);
                for &t in &a {
                    grid.neighbors_of_kind(t, &hood, SiteKind::Empty, &mut b);
                    assert!(b.contains(&s), "{shape:?}: {s} -> {t} not mirrored");
                }
            }
        }
    }

    #[test]
    fn shuffled_occupants_covers_every_cell_once() {
        let mut grid = planar(10, 10);
        for s in (0..100).step_by(3) {
            grid.place(s, cell(Phenotype::Sensitive)).unwrap();
        }
        let mut rng = SimRng::seeded(3);
        let mut order = grid.shuffled_occupants(&mut rng);
        assert_eq!(order.len(), grid.population().total());
        order.sort_unstable();
        assert_eq!(order, grid.occupied_sites().collect::<Vec<_>>());
    }

    #[test]
    fn well_mixed_fills_any_free_slot() {
        let mut grid = Grid::new(Dims::WellMixed { capacity: 3 });
        let a = grid.place_anywhere(cell(Phenotype::Sensitive)).unwrap();
        grid.place_anywhere(cell(Phenotype::Sensitive)).unwrap();
        grid.place_anywhere(cell(Phenotype::Resistant)).unwrap();
        assert!(grid.place_anywhere(cell(Phenotype::Resistant)).is_none());
        grid.remove(a).unwrap();
        assert_eq!(grid.place_anywhere(cell(Phenotype::Resistant)), Some(a));
        assert!(grid.snapshot().iter().all(|r| r.coord.is_none()));

        let mut planar = Grid::new(Dims::Planar { x: 2, y: 2 });
        assert!(planar.place_anywhere(cell(Phenotype::Sensitive)).is_none());
        assert_eq!(planar.population().total(), 0);
    }

    #[test]
    fn snapshot_lists_cells_in_site_order() {
        let mut grid = Grid::new(Dims::Volumetric { x: 2, y: 2, z: 2 });
        grid.place_at(Coord::new(1, 0, 1), cell(Phenotype::Resistant)).unwrap();
        grid.place_at(Coord::new(0, 1, 0), cell(Phenotype::Sensitive)).unwrap();
        let snap = grid.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].coord, Some(Coord::new(0, 1, 0)));
        assert_eq!(snap[1].phenotype, Phenotype::Resistant);
    }
}
