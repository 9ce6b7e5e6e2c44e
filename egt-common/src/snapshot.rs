use crate::coord::Coord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cell type with respect to the modeled drug.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phenotype {
    Sensitive = 0,
    Resistant = 1,
}

impl Phenotype {
    pub const ALL: [Phenotype; 2] = [Phenotype::Sensitive, Phenotype::Resistant];

    /// Row/column index into payoff and rate tables.
    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn other(self) -> Phenotype {
        match self {
            Phenotype::Sensitive => Phenotype::Resistant,
            Phenotype::Resistant => Phenotype::Sensitive,
        }
    }

    pub fn is_sensitive(self) -> bool {
        self == Phenotype::Sensitive
    }

    pub fn symbol(self) -> char {
        match self {
            Phenotype::Sensitive => 'S',
            Phenotype::Resistant => 'R',
        }
    }
}

impl fmt::Display for Phenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One live cell as seen by coordinate loggers and the statistics functions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    pub phenotype: Phenotype,
    /// Absent for well-mixed grids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coord: Option<Coord>,
}

/// Live cell counts per phenotype.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Population {
    pub sensitive: usize,
    pub resistant: usize,
}

impl Population {
    pub fn total(&self) -> usize {
        self.sensitive + self.resistant
    }

    pub fn add(&mut self, phenotype: Phenotype) {
        match phenotype {
            Phenotype::Sensitive => self.sensitive += 1,
            Phenotype::Resistant => self.resistant += 1,
        }
    }

    pub fn remove(&mut self, phenotype: Phenotype) {
        match phenotype {
            Phenotype::Sensitive => self.sensitive -= 1,
            Phenotype::Resistant => self.resistant -= 1,
        }
    }

    /// Tally a snapshot.
    pub fn count(records: &[CellRecord]) -> Population {
        let mut pop = Population::default();
        for r in records {
            pop.add(r.phenotype);
        }
        pop
    }
}
