//! Spatial evolutionary game simulation of drug-sensitive and drug-resistant
//! tumor cells under no, continuous and adaptive therapy.
//!
//! A [`Model`] owns a lattice [`Grid`] of cells and a seeded random source. Each
//! [`Model::step`] visits every live cell once in shuffled order and applies the
//! division and death rule against the live grid. The [`stats`] module computes
//! pair-correlation and Fs/Fr tables from the grid state.

pub mod cell;
pub mod driver;
pub mod grid;
pub mod hood;
pub mod layout;
pub mod model;
pub mod output;
pub mod rng;
pub mod stats;
pub mod therapy;

pub use cell::Cell;
pub use driver::{run_experiment, ScenarioSummary};
pub use grid::{Grid, SiteKind};
pub use hood::Neighborhood;
pub use model::{Model, TickReport};
pub use rng::SimRng;
pub use therapy::TherapyController;

pub use egt_common;
