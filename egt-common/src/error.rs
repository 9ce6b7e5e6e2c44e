use crate::coord::Coord;
use thiserror::Error;

/// Errors raised by the simulation engine.
///
/// All of these indicate a caller or configuration defect. Stochastic dead
/// ends (no empty site to divide into, no occupied game neighbors) are not
/// errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Placement onto a site that already holds a live cell.
    #[error("site {coord} is already occupied")]
    OccupiedSite { coord: Coord },

    /// Coordinate or site index outside the lattice.
    #[error("site {coord} is outside the grid")]
    OutOfBounds { coord: Coord },

    /// Removal from a site that holds no cell.
    #[error("site {coord} is empty")]
    EmptySite { coord: Coord },

    /// Initial population larger than the grid can hold.
    #[error("requested {requested} cells but the grid holds at most {capacity}")]
    Capacity { requested: usize, capacity: usize },

    /// Invalid radius, rate, payoff, threshold or layout.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    pub fn config(msg: impl Into<String>) -> Self {
        SimError::Configuration(msg.into())
    }
}
