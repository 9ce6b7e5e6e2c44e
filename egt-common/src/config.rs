use crate::coord::Dims;
use crate::error::SimError;
use crate::params::{
    DivisionRule, DrugModel, HoodShape, InitialLayout, ModelParams, PairCorrelationConfig, PayoffMatrix, RateTable,
    Scenario, TherapyPolicy,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Lattice shape, loaded from the [grid] section
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    /// "0D" (or "WM"), "2D" or "3D".
    #[serde(default = "default_dimension")]
    pub dimension: String,
    pub x: usize,
    pub y: usize,
    /// 3D depth. When absent the 3D grid is a cube holding roughly `x * y` sites.
    #[serde(default)]
    pub z: Option<usize>,
    /// Well-mixed capacity. Defaults to `x * y`.
    #[serde(default)]
    pub capacity: Option<usize>,
}

fn default_dimension() -> String {
    "2D".to_string()
}

impl GridConfig {
    pub fn dims(&self) -> std::result::Result<Dims, SimError> {
        match self.dimension.as_str() {
            "0D" | "WM" => Ok(Dims::WellMixed { capacity: self.capacity.unwrap_or(self.x * self.y) }),
            "2D" => Ok(Dims::Planar { x: self.x, y: self.y }),
            "3D" => match self.z {
                Some(z) => Ok(Dims::Volumetric { x: self.x, y: self.y, z }),
                None => {
                    let side = (((self.x * self.y) as f64).cbrt() + 1e-9).floor() as usize;
                    Ok(Dims::Volumetric { x: side, y: side, z: side })
                }
            },
            other => Err(SimError::config(format!("unsupported grid dimension '{other}'"))),
        }
    }
}

// Division and game neighborhoods
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct NeighborhoodConfig {
    #[serde(default = "HoodShape::von_neumann")]
    pub division: HoodShape,
    #[serde(default = "default_game_hood")]
    pub game: HoodShape,
}

fn default_game_hood() -> HoodShape {
    HoodShape::Circle { radius: 2 }
}

impl Default for NeighborhoodConfig {
    fn default() -> Self {
        NeighborhoodConfig { division: HoodShape::von_neumann(), game: default_game_hood() }
    }
}

// Division-rate rule and its inputs
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DivisionConfig {
    /// "rate_table", "game" or "sampled".
    #[serde(default = "default_rule")]
    pub rule: String,
    #[serde(default)]
    pub rate_sensitive: f64,
    #[serde(default)]
    pub rate_resistant: f64,
    // Payoff matrix [[A, B], [C, D]]
    #[serde(default, alias = "A")]
    pub a: f64,
    #[serde(default, alias = "B")]
    pub b: f64,
    #[serde(default, alias = "C")]
    pub c: f64,
    #[serde(default, alias = "D")]
    pub d: f64,
    /// Sites drawn per cell by the "sampled" rule.
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Lower clamp for the "sampled" rule.
    #[serde(default)]
    pub floor: f64,
    /// Overrides whether initial cells play the game. Defaults to `rule != "rate_table"`.
    #[serde(default)]
    pub interacting: Option<bool>,
}

fn default_rule() -> String {
    "game".to_string()
}

fn default_samples() -> usize {
    4
}

impl DivisionConfig {
    pub fn rule(&self) -> std::result::Result<DivisionRule, SimError> {
        match self.rule.as_str() {
            "rate_table" => Ok(DivisionRule::RateTable),
            "game" => Ok(DivisionRule::Game),
            "sampled" => Ok(DivisionRule::Sampled { samples: self.samples, floor: self.floor }),
            other => Err(SimError::config(format!("unsupported division rule '{other}'"))),
        }
    }
}

// Drug effect
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct DrugConfig {
    /// "growth_inhibition", "growth_scaling" or "kill".
    #[serde(default = "default_drug_model")]
    pub model: String,
    #[serde(default = "default_drug_parameter", alias = "drugGrowthReduction")]
    pub parameter: f64,
}

fn default_drug_model() -> String {
    "growth_inhibition".to_string()
}

fn default_drug_parameter() -> f64 {
    0.5
}

impl Default for DrugConfig {
    fn default() -> Self {
        DrugConfig { model: default_drug_model(), parameter: default_drug_parameter() }
    }
}

impl DrugConfig {
    pub fn model(&self) -> std::result::Result<DrugModel, SimError> {
        match self.model.as_str() {
            "growth_inhibition" => Ok(DrugModel::GrowthInhibition { reduction: self.parameter }),
            "growth_scaling" => Ok(DrugModel::GrowthScaling { factor: self.parameter }),
            "kill" => Ok(DrugModel::Kill { rate: self.parameter }),
            other => Err(SimError::config(format!("unsupported drug model '{other}'"))),
        }
    }
}

// Which drug schedules to run
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TherapyConfig {
    #[serde(default = "default_true", alias = "null")]
    pub run_null: bool,
    #[serde(default = "default_true", alias = "continuous")]
    pub run_continuous: bool,
    #[serde(default = "default_true", alias = "adaptive")]
    pub run_adaptive: bool,
    #[serde(default = "default_threshold", alias = "adaptiveTreatmentThreshold")]
    pub adaptive_threshold: f64,
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> f64 {
    0.5
}

impl Default for TherapyConfig {
    fn default() -> Self {
        TherapyConfig {
            run_null: true,
            run_continuous: true,
            run_adaptive: true,
            adaptive_threshold: default_threshold(),
        }
    }
}

// Initial tumor and death rate
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PopulationConfig {
    #[serde(alias = "deathRate")]
    pub death_rate: f64,
    #[serde(alias = "numCells")]
    pub num_cells: usize,
    #[serde(alias = "proportionResistant")]
    pub proportion_resistant: f64,
    /// "random", "linear", "convex", "concave" or "circle".
    #[serde(default = "default_layout")]
    pub layout: String,
    /// Gap width for the "linear" and "circle" layouts.
    #[serde(default, alias = "toyGap")]
    pub gap: u32,
}

fn default_layout() -> String {
    "random".to_string()
}

impl PopulationConfig {
    pub fn layout(&self) -> std::result::Result<InitialLayout, SimError> {
        match self.layout.as_str() {
            "random" => Ok(InitialLayout::Random),
            "linear" => Ok(InitialLayout::Linear { gap: self.gap }),
            "convex" => Ok(InitialLayout::Convex),
            "concave" => Ok(InitialLayout::Concave),
            "circle" => Ok(InitialLayout::Circle { gap: self.gap }),
            other => Err(SimError::config(format!("unsupported layout '{other}'"))),
        }
    }
}

// Run length and output cadences
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    #[serde(alias = "numTicks")]
    pub num_ticks: u64,
    #[serde(default)]
    pub seed: u64,
    /// Cadences in ticks; 0 disables the output.
    #[serde(default = "default_pop_every", alias = "writePopFrequency")]
    pub write_pop_every: u64,
    #[serde(default, alias = "writeModelFrequency")]
    pub write_coords_every: u64,
    #[serde(default, alias = "writePcFrequency")]
    pub write_pc_every: u64,
    #[serde(default)]
    pub write_fs_every: u64,
    #[serde(default = "default_fs_max_radius")]
    pub fs_max_radius: u32,
}

fn default_pop_every() -> u64 {
    1
}

fn default_fs_max_radius() -> u32 {
    5
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: String,
    /// Write a JSON summary of every scenario next to the CSV files.
    #[serde(default = "default_true")]
    pub save_summary: bool,
}

fn default_directory() -> String {
    "output".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig { directory: default_directory(), save_summary: true }
    }
}

/// Experiment configuration, loaded from a TOML or JSON file.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    #[serde(default)]
    pub neighborhoods: NeighborhoodConfig,
    pub division: DivisionConfig,
    #[serde(default)]
    pub drug: DrugConfig,
    #[serde(default)]
    pub therapy: TherapyConfig,
    pub population: PopulationConfig,
    pub run: RunConfig,
    #[serde(default)]
    pub pair_correlation: PairCorrelationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads and validates the configuration. Files ending in `.json` are parsed as JSON, anything else as TOML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file '{}'", path_ref.display()))?;
        let is_json = path_ref.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&config_str)
        } else {
            Self::from_toml_str(&config_str)
        }
        .with_context(|| format!("Invalid config file '{}'", path_ref.display()))?;

        log::debug!("Loaded configuration from {}", path_ref.display());
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(s).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(s).context("Failed to parse JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything that can be checked before a model is built.
    pub fn validate(&self) -> std::result::Result<(), SimError> {
        let dims = self.grid.dims()?;
        if self.population.num_cells == 0 {
            return Err(SimError::config("num_cells must be greater than 0"));
        }
        if self.population.num_cells > dims.capacity() {
            return Err(SimError::Capacity { requested: self.population.num_cells, capacity: dims.capacity() });
        }
        if !(0.0..=1.0).contains(&self.population.proportion_resistant) {
            return Err(SimError::config("proportion_resistant must lie in [0, 1]"));
        }
        let layout = self.population.layout()?;
        if layout != InitialLayout::Random && dims.dimension() != 2 {
            return Err(SimError::config(format!("layout '{}' is only available on 2D grids", self.population.layout)));
        }
        if self.run.write_fs_every > 0 && self.run.fs_max_radius == 0 {
            return Err(SimError::config("fs_max_radius must be at least 1"));
        }
        if !dims.is_spatial() && (self.run.write_pc_every > 0 || self.run.write_fs_every > 0) {
            return Err(SimError::config("spatial statistics need a 2D or 3D grid"));
        }
        for scenario in self.scenarios() {
            self.model_params(scenario)?.validate()?;
        }
        Ok(())
    }

    /// Scenarios enabled in the [therapy] section, in run order.
    pub fn scenarios(&self) -> Vec<Scenario> {
        let mut out = Vec::new();
        if self.therapy.run_null {
            out.push(Scenario::NoDrug);
        }
        if self.therapy.run_continuous {
            out.push(Scenario::Continuous);
        }
        if self.therapy.run_adaptive {
            out.push(Scenario::Adaptive);
        }
        out
    }

    /// Converts the configuration into the runtime parameters of one scenario.
    pub fn model_params(&self, scenario: Scenario) -> std::result::Result<ModelParams, SimError> {
        let rule = self.division.rule()?;
        let therapy = match scenario {
            Scenario::NoDrug => TherapyPolicy::None,
            Scenario::Continuous => TherapyPolicy::Continuous,
            Scenario::Adaptive => TherapyPolicy::Adaptive { threshold: self.therapy.adaptive_threshold },
        };
        Ok(ModelParams {
            dims: self.grid.dims()?,
            division_hood: self.neighborhoods.division,
            game_hood: self.neighborhoods.game,
            rule,
            rates: RateTable { sensitive: self.division.rate_sensitive, resistant: self.division.rate_resistant },
            payoff: PayoffMatrix::from_abcd(self.division.a, self.division.b, self.division.c, self.division.d),
            interacting: self.division.interacting.unwrap_or(rule != DivisionRule::RateTable),
            death_rate: self.population.death_rate,
            drug: self.drug.model()?,
            therapy,
        })
    }
}
