pub mod config;
pub mod coord;
pub mod error;
pub mod params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{
    DivisionConfig, DrugConfig, GridConfig, NeighborhoodConfig, OutputConfig, PopulationConfig, RunConfig,
    SimulationConfig, TherapyConfig,
};
pub use coord::{Coord, Dims};
pub use error::{Result, SimError};
pub use params::{
    DistanceMetric, DivisionRule, DrugModel, HoodShape, InitialLayout, ModelParams, PairCorrelationConfig,
    Pairing, PayoffMatrix, RateTable, Scenario, TherapyPolicy,
};
pub use snapshot::{CellRecord, Phenotype, Population};
