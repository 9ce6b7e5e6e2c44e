use crate::cell::Cell;
use crate::grid::Grid;
use crate::rng::SimRng;
use egt_common::{Coord, Dims, InitialLayout, Phenotype, Result, SimError};
use log::info;
use std::f64::consts::PI;

/// Places the starting tumor on an empty grid and returns how many cells were placed.
///
/// `num_cells` is ignored by the `Linear` and `Circle` layouts, which fill a
/// block determined by the grid size and the gap. Every placed cell is born at
/// tick 0.
pub fn place_initial(
    layout: InitialLayout,
    grid: &mut Grid,
    num_cells: usize,
    proportion_resistant: f64,
    interacting: bool,
    rng: &mut SimRng,
) -> Result<usize> {
    if !(0.0..=1.0).contains(&proportion_resistant) {
        return Err(SimError::config(format!("proportion resistant {proportion_resistant} must lie in [0, 1]")));
    }
    let mut placer = Placer { grid: &mut *grid, interacting, placed: 0 };
    match layout {
        InitialLayout::Random => random(&mut placer, num_cells, proportion_resistant, rng)?,
        InitialLayout::Linear { gap } => {
            let (x, y) = planar_extent(&placer, layout)?;
            linear(&mut placer, x, y, gap as i32, proportion_resistant)?
        }
        InitialLayout::Circle { gap } => {
            let (x, y) = planar_extent(&placer, layout)?;
            circle(&mut placer, x, y, gap as i32, proportion_resistant)?
        }
        InitialLayout::Convex | InitialLayout::Concave => {
            let (x, y) = planar_extent(&placer, layout)?;
            let inside = if layout == InitialLayout::Convex { Phenotype::Resistant } else { Phenotype::Sensitive };
            half_disk(&mut placer, x, y, num_cells, proportion_resistant, inside)?
        }
    }
    let placed = placer.placed;
    let pop = grid.population();
    info!("{layout:?} layout placed {placed} cells ({} sensitive, {} resistant)", pop.sensitive, pop.resistant);
    Ok(placed)
}

struct Placer<'a> {
    grid: &'a mut Grid,
    interacting: bool,
    placed: usize,
}

impl Placer<'_> {
    fn put(&mut self, site: usize, phenotype: Phenotype) -> Result<()> {
        self.grid.place(site, Cell::new(phenotype, self.interacting, 0))?;
        self.placed += 1;
        Ok(())
    }

    fn put_at(&mut self, x: i32, y: i32, phenotype: Phenotype) -> Result<()> {
        let site = self.grid.site_of(Coord::planar(x, y))?;
        self.put(site, phenotype)
    }
}

fn planar_extent(placer: &Placer, layout: InitialLayout) -> Result<(i32, i32)> {
    match *placer.grid.dims() {
        Dims::Planar { x, y } => Ok((x as i32, y as i32)),
        _ => Err(SimError::config(format!("{layout:?} layout needs a 2D grid"))),
    }
}

// Sites drawn without replacement; the first round(n * p) are resistant.
fn random(placer: &mut Placer, num_cells: usize, p: f64, rng: &mut SimRng) -> Result<()> {
    let capacity = placer.grid.capacity();
    if num_cells > capacity {
        return Err(SimError::Capacity { requested: num_cells, capacity });
    }
    let mut sites: Vec<usize> = (0..capacity).collect();
    rng.shuffle(&mut sites);
    let num_resistant = (num_cells as f64 * p).round() as usize;
    for (i, &site) in sites.iter().take(num_cells).enumerate() {
        let phenotype = if i < num_resistant { Phenotype::Resistant } else { Phenotype::Sensitive };
        placer.put(site, phenotype)?;
    }
    Ok(())
}

// Resistant columns on the left, `gap` empty columns, sensitive on the right,
// all inset by `gap` from the grid edge. The gap is exactly `gap` columns: an
// even gap is not widened into a band of `gap + 1` centred on the front.
fn linear(placer: &mut Placer, x: i32, y: i32, gap: i32, p: f64) -> Result<()> {
    if 2 * gap >= x.min(y) {
        return Err(SimError::config(format!("linear gap {gap} leaves no room on a {x}x{y} grid")));
    }
    let front = (x as f64 * p).ceil() as i32;
    let gap_start = front - (gap + 1) / 2;
    let gap_end = front + gap / 2;
    for cx in gap..x - gap {
        if cx >= gap_start && cx < gap_end {
            continue;
        }
        let phenotype = if cx < gap_start { Phenotype::Resistant } else { Phenotype::Sensitive };
        for cy in gap..y - gap {
            placer.put_at(cx, cy, phenotype)?;
        }
    }
    Ok(())
}

// Resistant disk centred in a sensitive square, separated by an empty ring.
fn circle(placer: &mut Placer, x: i32, y: i32, gap: i32, p: f64) -> Result<()> {
    let length = x.min(y) - 2 * gap;
    if length <= 0 {
        return Err(SimError::config(format!("circle gap {gap} leaves no room on a {x}x{y} grid")));
    }
    let half = length / 2;
    let num_resistant = ((length * length) as f64 * p) as i64;
    let radius = (num_resistant as f64 / PI).sqrt().round() as i64;
    let gap_radius = radius + gap as i64;
    for cx in gap..gap + length {
        for cy in gap..gap + length {
            let (rx, ry) = ((cx - gap - half) as i64, (cy - gap - half) as i64);
            let d2 = rx * rx + ry * ry;
            let in_disk = d2 <= radius * radius;
            if !in_disk && d2 <= gap_radius * gap_radius {
                continue;
            }
            let phenotype = if in_disk { Phenotype::Resistant } else { Phenotype::Sensitive };
            placer.put_at(cx, cy, phenotype)?;
        }
    }
    Ok(())
}

// Square block of side floor(sqrt(n)) centred on the grid, with a half-disk of
// `inside` cells anchored at the middle of its lower edge. The disk is sized to
// hold that phenotype's share of `n`.
fn half_disk(placer: &mut Placer, x: i32, y: i32, num_cells: usize, p: f64, inside: Phenotype) -> Result<()> {
    let length = (num_cells as f64).sqrt().floor() as i32;
    if length > x.min(y) {
        return Err(SimError::Capacity { requested: (length * length) as usize, capacity: placer.grid.capacity() });
    }
    let half = length / 2;
    let (start_x, start_y) = (x / 2 - half, y / 2 - half);
    let num_resistant = (num_cells as f64 * p).round() as usize;
    let share = match inside {
        Phenotype::Resistant => num_resistant,
        Phenotype::Sensitive => num_cells - num_resistant,
    };
    let radius = (2.0 * share as f64 / PI).sqrt();
    for rx in 0..length {
        for ry in 0..length {
            let d2 = ((rx - half) * (rx - half) + ry * ry) as f64;
            let phenotype = if d2 <= radius * radius { inside } else { inside.other() };
            placer.put_at(start_x + rx, start_y + ry, phenotype)?;
        }
    }
    Ok(())
}
