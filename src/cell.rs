use crate::grid::{Grid, SiteKind};
use crate::hood::Neighborhood;
use crate::rng::SimRng;
use egt_common::{DivisionRule, ModelParams, Phenotype, Result};

/// Per-site agent. Phenotype and `interacting` never change after creation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Cell {
    pub phenotype: Phenotype,
    /// Division rate comes from the game rule rather than the fixed rate table.
    pub interacting: bool,
    /// Tick in which the cell was created; cells are not stepped in their birth tick.
    pub born: u64,
}

impl Cell {
    pub fn new(phenotype: Phenotype, interacting: bool, born: u64) -> Self {
        Cell { phenotype, interacting, born }
    }

    /// Daughter with the same phenotype and interaction flag.
    pub fn offspring(&self, tick: u64) -> Cell {
        Cell { born: tick, ..*self }
    }
}

/// Read-only inputs shared by every cell during one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub params: &'a ModelParams,
    /// `None` on well-mixed grids.
    pub division_hood: Option<&'a Neighborhood>,
    pub game_hood: Option<&'a Neighborhood>,
    pub drug_concentration: u8,
    pub tick: u64,
}

/// What happened to one cell during its step.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CellOutcome {
    /// An offspring was placed.
    pub divided: bool,
    /// The drug killed the cell during a division attempt.
    pub killed: bool,
    /// Natural death.
    pub died: bool,
}

/// Division probability of `cell` at `site` before any drug effect.
pub fn division_rate(cell: &Cell, site: usize, grid: &Grid, ctx: &TickContext, rng: &mut SimRng) -> f64 {
    let params = ctx.params;
    if !cell.interacting {
        return params.rates.get(cell.phenotype);
    }
    let own = cell.phenotype;
    match params.rule {
        DivisionRule::RateTable => params.rates.get(own),
        DivisionRule::Game => match ctx.game_hood {
            Some(hood) => {
                let mut total = 0.0;
                let mut neighbors = 0usize;
                grid.for_each_neighbor(site, hood, |_, occupant| {
                    if let Some(other) = occupant {
                        total += params.payoff.get(own, other.phenotype);
                        neighbors += 1;
                    }
                });
                if neighbors == 0 {
                    params.payoff.self_payoff(own)
                } else {
                    total / neighbors as f64
                }
            }
            None => well_mixed_payoff(own, grid, params),
        },
        DivisionRule::Sampled { samples, floor } => {
            let mut total = 0.0;
            let mut neighbors = 0usize;
            for _ in 0..samples {
                let probe = rng.int(grid.capacity());
                if probe == site {
                    continue;
                }
                if let Some(other) = grid.get(probe) {
                    total += params.payoff.get(own, other.phenotype);
                    neighbors += 1;
                }
            }
            if neighbors == 0 {
                floor
            } else {
                (total / neighbors as f64).max(floor)
            }
        }
    }
}

// Game against every other live cell, computed from the population counts.
fn well_mixed_payoff(own: Phenotype, grid: &Grid, params: &ModelParams) -> f64 {
    let pop = grid.population();
    let mut others = [pop.sensitive, pop.resistant];
    others[own.index()] = others[own.index()].saturating_sub(1);
    let n = others[0] + others[1];
    if n == 0 {
        return params.payoff.self_payoff(own);
    }
    let total: f64 = Phenotype::ALL.iter().map(|&p| params.payoff.get(own, p) * others[p.index()] as f64).sum();
    total / n as f64
}

/// Runs one cell's transition rule against the live grid.
///
/// Division is tried first against the current occupancy, then natural death
/// is tested independently. Removals and insertions are visible to cells
/// stepped later in the same tick.
pub fn step_cell(
    site: usize,
    cell: Cell,
    grid: &mut Grid,
    ctx: &TickContext,
    rng: &mut SimRng,
    empty: &mut Vec<usize>,
) -> Result<CellOutcome> {
    let params = ctx.params;
    let mut outcome = CellOutcome::default();

    let mut rate = division_rate(&cell, site, grid, ctx, rng);
    let drug_on = ctx.drug_concentration > 0;
    if drug_on && cell.phenotype.is_sensitive() {
        rate *= params.drug.growth_multiplier();
    }

    if rng.double() < rate {
        let options = match ctx.division_hood {
            Some(hood) => grid.neighbors_of_kind(site, hood, SiteKind::Empty, empty),
            None => grid.capacity() - grid.population().total(),
        };
        if options > 0 {
            let kill_rate = params.drug.kill_rate();
            if kill_rate > 0.0 {
                let kill = kill_rate * ctx.drug_concentration as f64 * (1 - cell.phenotype.index()) as f64;
                if rng.double() < kill {
                    grid.remove(site)?;
                    outcome.killed = true;
                    return Ok(outcome);
                }
            }
            let daughter = cell.offspring(ctx.tick);
            if ctx.division_hood.is_some() {
                let target = empty[rng.int(options)];
                grid.place(target, daughter)?;
                outcome.divided = true;
            } else {
                outcome.divided = grid.place_anywhere(daughter).is_some();
            }
        }
    }

    if rng.double() < params.death_rate {
        grid.remove(site)?;
        outcome.died = true;
    }
    Ok(outcome)
}
