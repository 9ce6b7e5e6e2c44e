use crate::coord::Dims;
use crate::error::{Result, SimError};
use crate::snapshot::Phenotype;
use serde::{Deserialize, Serialize};

/// 2x2 game payoffs indexed by `[own][opponent]`, with Sensitive = 0 and Resistant = 1.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoffMatrix(pub [[f64; 2]; 2]);

impl PayoffMatrix {
    /// Build from the usual A, B, C, D labels: `[[A, B], [C, D]]`.
    pub fn from_abcd(a: f64, b: f64, c: f64, d: f64) -> Self {
        PayoffMatrix([[a, b], [c, d]])
    }

    #[inline(always)]
    pub fn get(&self, own: Phenotype, opponent: Phenotype) -> f64 {
        self.0[own.index()][opponent.index()]
    }

    /// Payoff of an isolated cell.
    #[inline(always)]
    pub fn self_payoff(&self, own: Phenotype) -> f64 {
        self.get(own, own)
    }
}

/// Fixed per-phenotype division probabilities used by non-interacting cells.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub sensitive: f64,
    pub resistant: f64,
}

impl RateTable {
    #[inline(always)]
    pub fn get(&self, phenotype: Phenotype) -> f64 {
        match phenotype {
            Phenotype::Sensitive => self.sensitive,
            Phenotype::Resistant => self.resistant,
        }
    }
}

/// How an interacting cell derives its division rate. Chosen once per model.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DivisionRule {
    /// Games disabled: every cell uses the rate table.
    RateTable,
    /// Average payoff against the occupied sites of the game neighborhood.
    Game,
    /// Average payoff against `samples` uniformly drawn grid sites, clamped to `floor`.
    Sampled { samples: usize, floor: f64 },
}

/// What the drug does to sensitive cells while `drug_concentration > 0`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DrugModel {
    /// Division rate scaled by `1 - reduction`.
    GrowthInhibition { reduction: f64 },
    /// Division rate scaled by `factor`.
    GrowthScaling { factor: f64 },
    /// No growth effect; a division attempt kills the parent with probability `rate`.
    Kill { rate: f64 },
}

impl DrugModel {
    /// Multiplier applied to a sensitive cell's division rate while drug is present.
    pub fn growth_multiplier(&self) -> f64 {
        match *self {
            DrugModel::GrowthInhibition { reduction } => 1.0 - reduction,
            DrugModel::GrowthScaling { factor } => factor,
            DrugModel::Kill { .. } => 1.0,
        }
    }

    pub fn kill_rate(&self) -> f64 {
        match *self {
            DrugModel::Kill { rate } => rate,
            _ => 0.0,
        }
    }
}

/// Drug scheduling policy.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TherapyPolicy {
    /// Drug never applied.
    None,
    /// Drug applied every tick.
    Continuous,
    /// Drug withdrawn below `starting * (1 - threshold)`, reinstated at `starting`.
    Adaptive { threshold: f64 },
}

impl TherapyPolicy {
    pub fn initial_concentration(&self) -> u8 {
        match self {
            TherapyPolicy::None => 0,
            TherapyPolicy::Continuous | TherapyPolicy::Adaptive { .. } => 1,
        }
    }
}

/// Neighborhood template shape. Templates exclude the origin.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum HoodShape {
    /// Manhattan ball: `|dx| + |dy| + |dz| <= radius`.
    VonNeumann { radius: u32 },
    /// Chebyshev ball: `max(|dx|, |dy|, |dz|) <= radius`.
    Moore { radius: u32 },
    /// Euclidean disk (2D) or sphere (3D): `dx² + dy² + dz² <= radius²`.
    Circle { radius: u32 },
    /// Axis-aligned box with the given half extents.
    Rectangle {
        half_x: u32,
        half_y: u32,
        #[serde(default)]
        half_z: u32,
    },
}

impl HoodShape {
    pub fn von_neumann() -> Self {
        HoodShape::VonNeumann { radius: 1 }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            HoodShape::VonNeumann { radius } | HoodShape::Moore { radius } | HoodShape::Circle { radius } => {
                if radius == 0 {
                    return Err(SimError::config(format!("{self:?}: radius must be at least 1")));
                }
            }
            HoodShape::Rectangle { half_x, half_y, half_z } => {
                if half_x == 0 && half_y == 0 && half_z == 0 {
                    return Err(SimError::config("rectangle neighborhood needs a non-zero half extent"));
                }
            }
        }
        Ok(())
    }
}

/// Starting arrangement of the tumor. Exactly one is used per run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitialLayout {
    /// `num_cells` sites drawn without replacement.
    Random,
    /// Resistant block on the left, sensitive on the right, separated by `gap` empty columns.
    Linear { gap: u32 },
    /// Square tumor with a resistant half-disk bulging into it.
    Convex,
    /// Square resistant tumor with a sensitive half-disk bulging into it.
    Concave,
    /// Resistant disk inside a sensitive square, separated by an empty ring of width `gap`.
    Circle { gap: u32 },
}

/// Distance used to bucket cell pairs.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// `|dx| + |dy| + |dz|`
    #[default]
    Manhattan,
    /// Euclidean distance rounded to the nearest integer.
    Euclidean,
}

impl DistanceMetric {
    #[inline(always)]
    pub fn distance(self, a: crate::Coord, b: crate::Coord) -> u32 {
        match self {
            DistanceMetric::Manhattan => a.manhattan(b),
            DistanceMetric::Euclidean => a.rounded_distance(b),
        }
    }

    pub fn max_distance(self, dims: &Dims) -> u32 {
        match self {
            DistanceMetric::Manhattan => dims.max_manhattan(),
            DistanceMetric::Euclidean => dims.max_rounded_euclidean(),
        }
    }

    /// Label written in the `measure` column of pair-correlation output.
    pub fn label(self) -> &'static str {
        match self {
            DistanceMetric::Manhattan => "annulus",
            DistanceMetric::Euclidean => "euclidean",
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pairing {
    /// Each unordered pair once: `N * (N - 1) / 2` pairs.
    #[default]
    Unordered,
    /// Both orders: `N * (N - 1)` pairs.
    Ordered,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCorrelationConfig {
    #[serde(default)]
    pub metric: DistanceMetric,
    #[serde(default)]
    pub pairing: Pairing,
    /// Normalize by the boundary-corrected annulus area.
    #[serde(default)]
    pub corrected: bool,
}

/// The three drug schedules compared by an experiment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    NoDrug,
    Continuous,
    Adaptive,
}

impl Scenario {
    pub fn name(self) -> &'static str {
        match self {
            Scenario::NoDrug => "nodrug",
            Scenario::Continuous => "continuous",
            Scenario::Adaptive => "adaptive",
        }
    }
}

/// Runtime parameters of one model, derived from the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub dims: Dims,
    /// Template searched for an empty site when dividing.
    pub division_hood: HoodShape,
    /// Template whose occupants are played against.
    pub game_hood: HoodShape,
    pub rule: DivisionRule,
    pub rates: RateTable,
    pub payoff: PayoffMatrix,
    /// Whether initially placed cells derive their rate from the rule (inherited by offspring).
    pub interacting: bool,
    pub death_rate: f64,
    pub drug: DrugModel,
    pub therapy: TherapyPolicy,
}

impl ModelParams {
    /// Checks every precondition the engine relies on.
    pub fn validate(&self) -> Result<()> {
        if self.dims.capacity() == 0 {
            return Err(SimError::config(format!("grid {:?} has no sites", self.dims)));
        }
        if self.dims.is_spatial() {
            self.division_hood.validate()?;
            self.game_hood.validate()?;
        }

        check_rate("rates.sensitive", self.rates.sensitive)?;
        check_rate("rates.resistant", self.rates.resistant)?;
        check_probability("death_rate", self.death_rate)?;

        if self.rule != DivisionRule::RateTable || self.interacting {
            for (i, row) in self.payoff.0.iter().enumerate() {
                for (j, v) in row.iter().enumerate() {
                    if !v.is_finite() {
                        return Err(SimError::config(format!("payoff[{i}][{j}] = {v} is not finite")));
                    }
                }
            }
        }
        if let DivisionRule::Sampled { samples, floor } = self.rule {
            if samples == 0 {
                return Err(SimError::config("sampled division rule needs at least one sample"));
            }
            check_rate("sampled floor", floor)?;
        }

        match self.drug {
            DrugModel::GrowthInhibition { reduction } => check_probability("drug reduction", reduction)?,
            DrugModel::GrowthScaling { factor } => check_rate("drug factor", factor)?,
            DrugModel::Kill { rate } => check_probability("drug kill rate", rate)?,
        }
        if let TherapyPolicy::Adaptive { threshold } = self.therapy {
            check_probability("adaptive threshold", threshold)?;
        }
        Ok(())
    }
}

fn check_rate(name: &str, v: f64) -> Result<()> {
    if !v.is_finite() || v < 0.0 {
        return Err(SimError::config(format!("{name} = {v} must be a non-negative number")));
    }
    Ok(())
}

fn check_probability(name: &str, v: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&v) {
        return Err(SimError::config(format!("{name} = {v} must lie in [0, 1]")));
    }
    Ok(())
}
