use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// Integer lattice coordinate. Planar grids keep `z == 0`.
///
/// Well-mixed grids have no geometry; their slots are reported as `(slot, 0, 0)`
/// when a coordinate is needed for an error message.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    pub const ORIGIN: Coord = Coord { x: 0, y: 0, z: 0 };

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Coord { x, y, z }
    }

    pub fn planar(x: i32, y: i32) -> Self {
        Coord { x, y, z: 0 }
    }

    pub fn slot(index: usize) -> Self {
        Coord { x: index as i32, y: 0, z: 0 }
    }

    /// `|dx| + |dy| + |dz|`
    pub fn manhattan(self, other: Coord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }

    pub fn distance_squared(self, other: Coord) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance rounded half-up to the nearest integer.
    pub fn rounded_distance(self, other: Coord) -> u32 {
        (self.distance_squared(other) as f64).sqrt().round() as u32
    }
}

impl Add for Coord {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Coord::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Coord {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Coord::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Lattice shape. Fixed for the lifetime of a model.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "dimension")]
pub enum Dims {
    /// 0D: a bag of `capacity` slots with no spatial structure.
    #[serde(rename = "0D")]
    WellMixed { capacity: usize },
    #[serde(rename = "2D")]
    Planar { x: usize, y: usize },
    #[serde(rename = "3D")]
    Volumetric { x: usize, y: usize, z: usize },
}

impl Dims {
    /// Number of spatial axes: 0, 2 or 3.
    pub fn dimension(&self) -> u8 {
        match self {
            Dims::WellMixed { .. } => 0,
            Dims::Planar { .. } => 2,
            Dims::Volumetric { .. } => 3,
        }
    }

    /// Extents along x, y, z (unused axes report 1). Well-mixed grids report `(capacity, 1, 1)`.
    pub fn extents(&self) -> (usize, usize, usize) {
        match *self {
            Dims::WellMixed { capacity } => (capacity, 1, 1),
            Dims::Planar { x, y } => (x, y, 1),
            Dims::Volumetric { x, y, z } => (x, y, z),
        }
    }

    pub fn capacity(&self) -> usize {
        let (x, y, z) = self.extents();
        x * y * z
    }

    pub fn is_spatial(&self) -> bool {
        self.dimension() > 0
    }

    pub fn contains(&self, c: Coord) -> bool {
        if !self.is_spatial() {
            return false;
        }
        let (x, y, z) = self.extents();
        c.x >= 0 && c.y >= 0 && c.z >= 0 && (c.x as usize) < x && (c.y as usize) < y && (c.z as usize) < z
    }

    /// Site index of an in-bounds coordinate, `(x * ydim + y) * zdim + z`.
    #[inline(always)]
    pub fn index_of(&self, c: Coord) -> Option<usize> {
        if !self.contains(c) {
            return None;
        }
        let (_, y, z) = self.extents();
        Some((c.x as usize * y + c.y as usize) * z + c.z as usize)
    }

    /// Inverse of [`Dims::index_of`]; `None` for well-mixed grids or out-of-range indices.
    #[inline(always)]
    pub fn coord_of(&self, index: usize) -> Option<Coord> {
        if !self.is_spatial() || index >= self.capacity() {
            return None;
        }
        let (_, y, z) = self.extents();
        let cz = index % z;
        let cy = (index / z) % y;
        let cx = index / (y * z);
        Some(Coord::new(cx as i32, cy as i32, cz as i32))
    }

    /// Coordinate used when reporting a site in an error.
    pub fn describe(&self, index: usize) -> Coord {
        self.coord_of(index).unwrap_or_else(|| Coord::slot(index))
    }

    /// Largest Manhattan distance between two sites.
    pub fn max_manhattan(&self) -> u32 {
        let (x, y, z) = self.extents();
        (x.saturating_sub(1) + y.saturating_sub(1) + z.saturating_sub(1)) as u32
    }

    /// Largest rounded Euclidean distance between two sites.
    pub fn max_rounded_euclidean(&self) -> u32 {
        let (x, y, z) = self.extents();
        let far = Coord::new(x as i32 - 1, y as i32 - 1, z as i32 - 1);
        Coord::ORIGIN.rounded_distance(far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_index_round_trips_through_coord() {
        let dims = Dims::Planar { x: 4, y: 3 };
        for idx in 0..dims.capacity() {
            let c = dims.coord_of(idx).unwrap();
            assert_eq!(dims.index_of(c), Some(idx));
        }
        assert_eq!(dims.index_of(Coord::planar(1, 2)), Some(5));
    }

    #[test]
    fn out_of_bounds_coords_have_no_index() {
        let dims = Dims::Volumetric { x: 2, y: 2, z: 2 };
        assert_eq!(dims.index_of(Coord::new(-1, 0, 0)), None);
        assert_eq!(dims.index_of(Coord::new(0, 2, 0)), None);
        assert_eq!(dims.index_of(Coord::new(1, 1, 1)), Some(7));
    }

    #[test]
    fn well_mixed_has_no_geometry() {
        let dims = Dims::WellMixed { capacity: 10 };
        assert_eq!(dims.capacity(), 10);
        assert!(!dims.contains(Coord::ORIGIN));
        assert_eq!(dims.coord_of(3), None);
        assert_eq!(dims.describe(3), Coord::slot(3));
    }

    #[test]
    fn distance_helpers() {
        let a = Coord::planar(0, 0);
        let b = Coord::planar(3, 4);
        assert_eq!(a.manhattan(b), 7);
        assert_eq!(a.rounded_distance(b), 5);
        assert_eq!(Dims::Planar { x: 10, y: 10 }.max_manhattan(), 18);
        assert_eq!(Dims::Planar { x: 4, y: 5 }.max_rounded_euclidean(), 5);
    }
}
