use egt_common::{Coord, HoodShape, Result, SimError};

/// Precomputed list of relative offsets for one neighborhood shape.
///
/// Built once per model from the configuration; depends only on the shape and
/// the grid dimensionality, never on occupancy. Offsets are ordered x-major and
/// never include the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighborhood {
    offsets: Vec<Coord>,
}

impl Neighborhood {
    /// Builds the template for a 2D or 3D lattice.
    pub fn new(shape: HoodShape, dimension: u8) -> Result<Self> {
        shape.validate()?;
        if dimension != 2 && dimension != 3 {
            return Err(SimError::config(format!("neighborhoods need a 2D or 3D grid, got {dimension}D")));
        }
        let (rx, ry, rz) = match shape {
            HoodShape::VonNeumann { radius } | HoodShape::Moore { radius } | HoodShape::Circle { radius } => {
                (radius, radius, radius)
            }
            HoodShape::Rectangle { half_x, half_y, half_z } => (half_x, half_y, half_z),
        };
        let (rx, ry, rz) = (rx as i32, ry as i32, if dimension == 3 { rz as i32 } else { 0 });

        let mut offsets = Vec::new();
        for dx in -rx..=rx {
            for dy in -ry..=ry {
                for dz in -rz..=rz {
                    if dx == 0 && dy == 0 && dz == 0 {
                        continue;
                    }
                    if includes(shape, dx, dy, dz) {
                        offsets.push(Coord::new(dx, dy, dz));
                    }
                }
            }
        }
        if offsets.is_empty() {
            return Err(SimError::config(format!("{shape:?} is empty on a {dimension}D grid")));
        }
        Ok(Neighborhood { offsets })
    }

    pub fn offsets(&self) -> &[Coord] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

#[inline(always)]
fn includes(shape: HoodShape, dx: i32, dy: i32, dz: i32) -> bool {
    match shape {
        HoodShape::VonNeumann { radius } => dx.unsigned_abs() + dy.unsigned_abs() + dz.unsigned_abs() <= radius,
        HoodShape::Moore { radius } => dx.unsigned_abs().max(dy.unsigned_abs()).max(dz.unsigned_abs()) <= radius,
        HoodShape::Circle { radius } => {
            let r = radius as i64;
            (dx as i64).pow(2) + (dy as i64).pow(2) + (dz as i64).pow(2) <= r * r
        }
        // Bounds already limited by the loop ranges.
        HoodShape::Rectangle { .. } => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sizes(shape: HoodShape) -> (usize, usize) {
        (Neighborhood::new(shape, 2).unwrap().len(), Neighborhood::new(shape, 3).unwrap().len())
    }

    #[test]
    fn template_sizes_match_lattice_geometry() {
        assert_eq!(sizes(HoodShape::VonNeumann { radius: 1 }), (4, 6));
        assert_eq!(sizes(HoodShape::Moore { radius: 1 }), (8, 26));
        assert_eq!(sizes(HoodShape::VonNeumann { radius: 2 }), (12, 24));
        // r = 2 disk: 13 points including origin
        assert_eq!(sizes(HoodShape::Circle { radius: 2 }).0, 12);
        assert_eq!(sizes(HoodShape::Rectangle { half_x: 2, half_y: 1, half_z: 1 }), (14, 44));
    }

    #[test]
    fn templates_exclude_origin_and_are_symmetric() {
        let shapes = [
            HoodShape::VonNeumann { radius: 3 },
            HoodShape::Moore { radius: 2 },
            HoodShape::Circle { radius: 4 },
            HoodShape::Rectangle { half_x: 3, half_y: 1, half_z: 2 },
        ];
        for shape in shapes {
            for dim in [2, 3] {
                let hood = Neighborhood::new(shape, dim).unwrap();
                let set: HashSet<Coord> = hood.offsets().iter().copied().collect();
                assert_eq!(set.len(), hood.len(), "duplicate offsets in {shape:?}");
                assert!(!set.contains(&Coord::ORIGIN));
                for o in hood.offsets() {
                    assert!(set.contains(&(Coord::ORIGIN - *o)), "{shape:?} not symmetric at {o}");
                    if dim == 2 {
                        assert_eq!(o.z, 0);
                    }
                }
            }
        }
    }

    #[test]
    fn construction_is_deterministic() {
        let a = Neighborhood::new(HoodShape::Circle { radius: 3 }, 3).unwrap();
        let b = Neighborhood::new(HoodShape::Circle { radius: 3 }, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(Neighborhood::new(HoodShape::Moore { radius: 0 }, 2).is_err());
        assert!(Neighborhood::new(HoodShape::Rectangle { half_x: 0, half_y: 0, half_z: 2 }, 2).is_err());
        assert!(Neighborhood::new(HoodShape::von_neumann(), 0).is_err());
    }
}
