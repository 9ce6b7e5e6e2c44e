use crate::cell::{step_cell, Cell, TickContext};
use crate::grid::Grid;
use crate::hood::Neighborhood;
use crate::layout::place_initial;
use crate::rng::SimRng;
use crate::stats::{fs_fr, pair_correlation, AnnulusTable, FsFrTable, PairCorrelationTable};
use crate::therapy::TherapyController;
use egt_common::{
    CellRecord, Coord, DistanceMetric, HoodShape, InitialLayout, ModelParams, PairCorrelationConfig, Phenotype,
    Population, Result, SimError,
};
use log::{debug, info, trace};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Counts gathered while stepping one tick.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    pub births: usize,
    /// Natural deaths.
    pub deaths: usize,
    /// Drug-induced deaths.
    pub kills: usize,
    /// Concentration every cell saw during this tick.
    pub drug_concentration: u8,
}

/// One simulation run: grid, random source, neighborhood templates and drug state.
///
/// Cells are updated asynchronously. Each tick visits the cells alive at its
/// start in a fresh random order, and every birth or death is visible to the
/// cells visited after it. The drug concentration is only changed between
/// ticks.
pub struct Model {
    params: ModelParams,
    grid: Grid,
    rng: SimRng,
    /// `None` on well-mixed grids.
    division_hood: Option<Neighborhood>,
    game_hood: Option<Neighborhood>,
    therapy: TherapyController,
    tick: u64,
    /// Boundary-correction tables, built on first use or shared in.
    annulus: HashMap<DistanceMetric, Arc<AnnulusTable>>,
    /// Circle templates of radius 1..=n for Fs/Fr.
    fs_hoods: Vec<Neighborhood>,
    // Reused buffer for empty division sites.
    empty_sites: Vec<usize>,
}

impl Model {
    /// Creates a model with an empty grid. Fails on invalid parameters.
    pub fn new(params: ModelParams, rng: SimRng) -> Result<Self> {
        params.validate()?;
        let dims = params.dims;
        let (division_hood, game_hood) = if dims.is_spatial() {
            (
                Some(Neighborhood::new(params.division_hood, dims.dimension())?),
                Some(Neighborhood::new(params.game_hood, dims.dimension())?),
            )
        } else {
            (None, None)
        };
        info!(
            "model on {:?}: rule {:?}, drug {:?}, therapy {:?}, death rate {}",
            dims, params.rule, params.drug, params.therapy, params.death_rate
        );
        if let (Some(d), Some(g)) = (&division_hood, &game_hood) {
            debug!("division template {} sites, game template {} sites", d.len(), g.len());
        }
        Ok(Model {
            grid: Grid::new(dims),
            therapy: TherapyController::new(params.therapy),
            params,
            rng,
            division_hood,
            game_hood,
            tick: 0,
            annulus: HashMap::new(),
            fs_hoods: Vec::new(),
            empty_sites: Vec::new(),
        })
    }

    pub fn with_seed(params: ModelParams, seed: u64) -> Result<Self> {
        Model::new(params, SimRng::seeded(seed))
    }

    /// Places the starting tumor and records its size as the adaptive-therapy reference.
    pub fn initialize(&mut self, layout: InitialLayout, num_cells: usize, proportion_resistant: f64) -> Result<usize> {
        if self.grid.population().total() > 0 {
            return Err(SimError::config("initial layout must be placed on an empty grid"));
        }
        let interacting = self.params.interacting;
        let placed = place_initial(layout, &mut self.grid, num_cells, proportion_resistant, interacting, &mut self.rng)?;
        self.therapy.set_starting_population(placed);
        Ok(placed)
    }

    /// Random layout; the usual entry point.
    pub fn initialize_random(&mut self, num_cells: usize, proportion_resistant: f64) -> Result<usize> {
        self.initialize(InitialLayout::Random, num_cells, proportion_resistant)
    }

    /// Puts a single cell on `coord`. It is first stepped in the next tick.
    pub fn place_cell(&mut self, coord: Coord, phenotype: Phenotype) -> Result<usize> {
        let cell = Cell::new(phenotype, self.params.interacting, self.tick);
        if self.grid.dims().is_spatial() {
            self.grid.place_at(coord, cell)
        } else {
            let capacity = self.grid.capacity();
            self.grid
                .place_anywhere(cell)
                .ok_or(SimError::Capacity { requested: self.grid.population().total() + 1, capacity })
        }
    }

    pub fn set_starting_population(&mut self, n: usize) {
        self.therapy.set_starting_population(n);
    }

    /// Advances one tick.
    pub fn step(&mut self) -> Result<TickReport> {
        self.advance(None)
    }

    /// Advances one tick and reports how division success depended on local
    /// competitor frequency at the start of it, for radii `1..=max_radius`.
    pub fn step_measuring_fs_fr(&mut self, max_radius: u32) -> Result<(TickReport, FsFrTable)> {
        if !self.grid.dims().is_spatial() {
            return Err(SimError::config("Fs/Fr needs a spatial grid"));
        }
        if max_radius == 0 {
            return Err(SimError::config("Fs/Fr needs a maximum radius of at least 1"));
        }
        if self.fs_hoods.len() != max_radius as usize {
            let dimension = self.grid.dims().dimension();
            self.fs_hoods = (1..=max_radius)
                .map(|radius| Neighborhood::new(HoodShape::Circle { radius }, dimension))
                .collect::<Result<_>>()?;
        }
        let observations = fs_fr::observe(&self.grid, &self.fs_hoods);
        let mut divided = HashSet::new();
        let report = self.advance(Some(&mut divided))?;
        let table = FsFrTable::tally(&observations, &divided);
        debug!(
            "tick {}: Fs/Fr over {} cells, {} Fs bins, {} Fr bins",
            report.tick,
            observations.len(),
            table.fs.len(),
            table.fr.len()
        );
        Ok((report, table))
    }

    fn advance(&mut self, mut divided: Option<&mut HashSet<usize>>) -> Result<TickReport> {
        self.tick += 1;
        let tick = self.tick;
        let drug = self.therapy.drug_concentration();
        let order = self.grid.shuffled_occupants(&mut self.rng);

        let ctx = TickContext {
            params: &self.params,
            division_hood: self.division_hood.as_ref(),
            game_hood: self.game_hood.as_ref(),
            drug_concentration: drug,
            tick,
        };
        let mut report = TickReport { tick, drug_concentration: drug, ..TickReport::default() };

        for site in order {
            // Vacated earlier this tick, or refilled by a newborn.
            let cell = match self.grid.get(site) {
                Some(cell) if cell.born < tick => *cell,
                _ => continue,
            };
            let outcome = step_cell(site, cell, &mut self.grid, &ctx, &mut self.rng, &mut self.empty_sites)?;
            if outcome.divided {
                report.births += 1;
                if let Some(divided) = divided.as_deref_mut() {
                    divided.insert(site);
                }
            }
            report.kills += outcome.killed as usize;
            report.deaths += outcome.died as usize;
        }

        let pop = self.grid.population();
        self.therapy.update(pop.total());
        trace!(
            "tick {tick}: {} S, {} R, +{} -{} x{}, drug {drug}",
            pop.sensitive,
            pop.resistant,
            report.births,
            report.deaths,
            report.kills
        );
        Ok(report)
    }

    /// Hands the model a correction table built elsewhere for the same grid,
    /// so runs on one geometry build it only once.
    pub fn share_annulus(&mut self, table: Arc<AnnulusTable>) -> Result<()> {
        if table.dims() != self.grid.dims() {
            return Err(SimError::config(format!(
                "annulus table for {:?} does not fit a {:?} grid",
                table.dims(),
                self.grid.dims()
            )));
        }
        self.annulus.insert(table.metric(), table);
        Ok(())
    }

    /// Pair correlation of the current grid. Correction tables are built once per metric.
    pub fn pair_correlation(&mut self, config: &PairCorrelationConfig) -> Result<PairCorrelationTable> {
        let dims = *self.grid.dims();
        if config.corrected && !self.annulus.contains_key(&config.metric) {
            let table = AnnulusTable::build(dims, config.metric)?;
            self.annulus.insert(config.metric, Arc::new(table));
        }
        let table = if config.corrected { self.annulus.get(&config.metric).map(Arc::as_ref) } else { None };
        let cells = self.grid.snapshot_with_sites();
        pair_correlation(&cells, &dims, config, table)
    }

    pub fn population(&self) -> Population {
        self.grid.population()
    }

    /// Live cells in site order.
    pub fn snapshot(&self) -> Vec<CellRecord> {
        self.grid.snapshot()
    }

    /// Concentration the next tick will use.
    pub fn drug_concentration(&self) -> u8 {
        self.therapy.drug_concentration()
    }

    pub fn starting_population(&self) -> usize {
        self.therapy.starting_population()
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egt_common::{Dims, DivisionRule, DrugModel, PayoffMatrix, RateTable, TherapyPolicy};

    fn params(dims: Dims) -> ModelParams {
        ModelParams {
            dims,
            division_hood: HoodShape::von_neumann(),
            game_hood: HoodShape::Circle { radius: 2 },
            rule: DivisionRule::Game,
            rates: RateTable { sensitive: 0.03, resistant: 0.02 },
            payoff: PayoffMatrix::from_abcd(0.03, 0.06, 0.04, 0.02),
            interacting: true,
            death_rate: 0.009,
            drug: DrugModel::GrowthInhibition { reduction: 1.0 },
            therapy: TherapyPolicy::Adaptive { threshold: 0.5 },
        }
    }

    fn check_consistent(model: &Model) {
        let snap = model.snapshot();
        assert_eq!(snap.len(), model.population().total());
        assert_eq!(Population::count(&snap), model.population());
        let mut coords: Vec<_> = snap.iter().filter_map(|r| r.coord).collect();
        coords.sort_by_key(|c| (c.x, c.y, c.z));
        coords.dedup();
        if model.grid().dims().is_spatial() {
            assert_eq!(coords.len(), snap.len());
        }
    }

    #[test]
    fn rejects_invalid_params() {
        let mut p = params(Dims::Planar { x: 5, y: 5 });
        p.death_rate = 2.0;
        assert!(matches!(Model::with_seed(p, 1), Err(SimError::Configuration(_))));
    }

    #[test]
    fn population_matches_occupancy_every_tick() {
        for dims in [Dims::WellMixed { capacity: 400 }, Dims::Planar { x: 20, y: 20 }, Dims::Volumetric { x: 8, y: 8, z: 8 }] {
            let mut model = Model::with_seed(params(dims), 7).unwrap();
            model.initialize_random(60, 0.3).unwrap();
            for _ in 0..25 {
                let before = model.population().total();
                let report = model.step().unwrap();
                assert_eq!(model.population().total() + report.deaths + report.kills, before + report.births);
                check_consistent(&model);
            }
        }
    }

    #[test]
    fn newborns_wait_for_next_tick() {
        let mut p = params(Dims::Planar { x: 9, y: 9 });
        p.rule = DivisionRule::RateTable;
        p.rates = RateTable { sensitive: 1.0, resistant: 1.0 };
        p.death_rate = 0.0;
        p.therapy = TherapyPolicy::None;
        let mut model = Model::with_seed(p, 3).unwrap();
        model.place_cell(Coord::planar(4, 4), Phenotype::Sensitive).unwrap();
        assert_eq!(model.step().unwrap().births, 1);
        assert_eq!(model.population().total(), 2);
        assert_eq!(model.step().unwrap().births, 2);
        assert_eq!(model.population().total(), 4);
    }

    #[test]
    fn pair_correlation_table_is_cached_per_metric() {
        let mut model = Model::with_seed(params(Dims::Planar { x: 12, y: 12 }), 5).unwrap();
        model.initialize_random(30, 0.5).unwrap();
        let cfg = PairCorrelationConfig { corrected: true, ..PairCorrelationConfig::default() };
        let a = model.pair_correlation(&cfg).unwrap();
        let b = model.pair_correlation(&cfg).unwrap();
        assert_eq!(a, b);
        assert_eq!(model.annulus.len(), 1);
        let raw = model.pair_correlation(&PairCorrelationConfig::default()).unwrap();
        assert_eq!(raw.total(), 30.0 * 29.0 / 2.0);
    }

    #[test]
    fn shared_annulus_table_is_reused() {
        let dims = Dims::Planar { x: 12, y: 12 };
        let shared = Arc::new(AnnulusTable::build(dims, DistanceMetric::Manhattan).unwrap());
        let cfg = PairCorrelationConfig { corrected: true, ..PairCorrelationConfig::default() };

        let mut own = Model::with_seed(params(dims), 5).unwrap();
        own.initialize_random(30, 0.5).unwrap();
        let mut lent = Model::with_seed(params(dims), 5).unwrap();
        lent.initialize_random(30, 0.5).unwrap();
        lent.share_annulus(Arc::clone(&shared)).unwrap();

        assert_eq!(lent.pair_correlation(&cfg).unwrap(), own.pair_correlation(&cfg).unwrap());
        assert!(Arc::ptr_eq(&lent.annulus[&DistanceMetric::Manhattan], &shared));

        let mut other = Model::with_seed(params(Dims::Planar { x: 10, y: 12 }), 5).unwrap();
        assert!(other.share_annulus(shared).is_err());
        assert!(other.annulus.is_empty());
    }

    #[test]
    fn statistics_reject_well_mixed_grid() {
        let mut model = Model::with_seed(params(Dims::WellMixed { capacity: 100 }), 5).unwrap();
        model.initialize_random(10, 0.5).unwrap();
        assert!(model.pair_correlation(&PairCorrelationConfig::default()).is_err());
        assert!(model.step_measuring_fs_fr(3).is_err());
    }

    #[test]
    fn fs_fr_counts_each_start_of_tick_cell_once_per_radius() {
        let mut model = Model::with_seed(params(Dims::Planar { x: 15, y: 15 }), 9).unwrap();
        model.initialize_random(80, 0.4).unwrap();
        let pop = model.population();
        let (report, table) = model.step_measuring_fs_fr(4).unwrap();
        for radius in 1..=4 {
            let fs: u64 = table.fs.iter().filter(|((r, _), _)| *r == radius).map(|(_, b)| b.total).sum();
            let fr: u64 = table.fr.iter().filter(|((r, _), _)| *r == radius).map(|(_, b)| b.total).sum();
            assert_eq!(fs as usize, pop.resistant);
            assert_eq!(fr as usize, pop.sensitive);
            let reproduced: u64 = table.fs.iter().chain(table.fr.iter()).filter(|((r, _), _)| *r == radius).map(|(_, b)| b.reproduced).sum();
            assert_eq!(reproduced as usize, report.births);
        }
    }

    #[test]
    fn kill_model_reports_kills_under_continuous_drug() {
        let mut p = params(Dims::Planar { x: 20, y: 20 });
        p.rule = DivisionRule::RateTable;
        p.rates = RateTable { sensitive: 1.0, resistant: 1.0 };
        p.death_rate = 0.0;
        p.drug = DrugModel::Kill { rate: 1.0 };
        p.therapy = TherapyPolicy::Continuous;
        let mut model = Model::with_seed(p, 21).unwrap();
        model.initialize_random(40, 0.0).unwrap();
        let report = model.step().unwrap();
        assert_eq!(report.drug_concentration, 1);
        assert_eq!(report.births, 0);
        assert!(report.kills > 0);
        assert_eq!(model.population().total(), 40 - report.kills);
    }
}
