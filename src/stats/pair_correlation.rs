use super::{AnnulusTable, Category, CategoryCounts};
use egt_common::{CellRecord, Coord, Dims, PairCorrelationConfig, Pairing, Result, SimError};
use serde::Serialize;
use std::collections::BTreeMap;

/// Distance-binned pair counts for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairCorrelationTable {
    pub config: PairCorrelationConfig,
    /// One row per distance `0..=max_distance`, including empty ones.
    pub rows: BTreeMap<u32, CategoryCounts>,
}

impl PairCorrelationTable {
    /// Value written to the `measure` column: metric label, `_corrected` when normalized.
    pub fn measure(&self) -> String {
        let label = self.config.metric.label();
        if self.config.corrected {
            format!("{label}_corrected")
        } else {
            label.to_string()
        }
    }

    /// Sum over every distance and category.
    pub fn total(&self) -> f64 {
        self.rows.values().map(CategoryCounts::total).sum()
    }
}

/// Classifies every pair of distinct live cells by phenotype and distance.
///
/// `cells` pairs each record with its site index. With `config.corrected`, an
/// ordered pair counts `capacity / n` where `n` is the number of in-bounds
/// sites at that distance from the first cell's site, taken from `table`. An
/// unordered pair counts the mean of its two ordered weights, so the result
/// does not change when the grid is mirrored.
pub fn pair_correlation(
    cells: &[(usize, CellRecord)],
    dims: &Dims,
    config: &PairCorrelationConfig,
    table: Option<&AnnulusTable>,
) -> Result<PairCorrelationTable> {
    if !dims.is_spatial() {
        return Err(SimError::config("pair correlation needs a spatial grid"));
    }
    let table = match (config.corrected, table) {
        (false, _) => None,
        (true, Some(t)) if t.metric() == config.metric && t.dims() == dims => Some(t),
        (true, _) => return Err(SimError::config("corrected pair correlation needs a matching annulus table")),
    };

    let max_distance = config.metric.max_distance(dims);
    let mut rows: BTreeMap<u32, CategoryCounts> = (0..=max_distance).map(|d| (d, CategoryCounts::default())).collect();
    let area = dims.capacity() as f64;

    let located: Vec<(usize, CellRecord, Coord)> = cells
        .iter()
        .map(|&(site, record)| {
            let coord = record.coord.ok_or(SimError::OutOfBounds { coord: dims.describe(site) })?;
            Ok((site, record, coord))
        })
        .collect::<Result<_>>()?;

    let mut tally = |first: &(usize, CellRecord, Coord), second: &(usize, CellRecord, Coord)| {
        let distance = config.metric.distance(first.2, second.2);
        let weight = match (table, config.pairing) {
            (None, _) => 1.0,
            (Some(t), Pairing::Ordered) => match t.count(first.0, distance) {
                0 => return,
                n => area / n as f64,
            },
            (Some(t), Pairing::Unordered) => match (t.count(first.0, distance), t.count(second.0, distance)) {
                (0, _) | (_, 0) => return,
                (n, m) => area * 0.5 * (1.0 / n as f64 + 1.0 / m as f64),
            },
        };
        rows.entry(distance).or_default().add(Category::of(first.1.phenotype, second.1.phenotype), weight);
    };

    for (i, first) in located.iter().enumerate() {
        match config.pairing {
            Pairing::Unordered => {
                for second in &located[i + 1..] {
                    tally(first, second);
                }
            }
            Pairing::Ordered => {
                for (j, second) in located.iter().enumerate() {
                    if i != j {
                        tally(first, second);
                    }
                }
            }
        }
    }

    Ok(PairCorrelationTable { config: *config, rows })
}
