//! Spatial statistics over a read-only view of the grid.
//!
//! Nothing here mutates the grid. Results are plain ordered maps so the CSV
//! writers can stream them in a stable order.

pub mod annulus;
pub mod fs_fr;
pub mod pair_correlation;

pub use annulus::AnnulusTable;
pub use fs_fr::{FsFrBin, FsFrObservation, FsFrTable};
pub use pair_correlation::{pair_correlation, PairCorrelationTable};

use egt_common::Phenotype;
use serde::Serialize;
use std::fmt;

/// Phenotype combination of an ordered cell pair (first, second).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Category {
    SS,
    RR,
    RS,
    SR,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::SS, Category::RR, Category::RS, Category::SR];

    #[inline(always)]
    pub fn of(first: Phenotype, second: Phenotype) -> Category {
        match (first, second) {
            (Phenotype::Sensitive, Phenotype::Sensitive) => Category::SS,
            (Phenotype::Resistant, Phenotype::Resistant) => Category::RR,
            (Phenotype::Resistant, Phenotype::Sensitive) => Category::RS,
            (Phenotype::Sensitive, Phenotype::Resistant) => Category::SR,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::SS => "SS",
            Category::RR => "RR",
            Category::RS => "RS",
            Category::SR => "SR",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pair totals for one distance bucket. Raw counts are whole numbers;
/// boundary-corrected totals are weighted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct CategoryCounts {
    pub ss: f64,
    pub rr: f64,
    pub rs: f64,
    pub sr: f64,
}

impl CategoryCounts {
    #[inline(always)]
    pub fn add(&mut self, category: Category, weight: f64) {
        *self.slot(category) += weight;
    }

    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::SS => self.ss,
            Category::RR => self.rr,
            Category::RS => self.rs,
            Category::SR => self.sr,
        }
    }

    pub fn total(&self) -> f64 {
        self.ss + self.rr + self.rs + self.sr
    }

    fn slot(&mut self, category: Category) -> &mut f64 {
        match category {
            Category::SS => &mut self.ss,
            Category::RR => &mut self.rr,
            Category::RS => &mut self.rs,
            Category::SR => &mut self.sr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_first_then_second() {
        assert_eq!(Category::of(Phenotype::Resistant, Phenotype::Sensitive), Category::RS);
        assert_eq!(Category::of(Phenotype::Sensitive, Phenotype::Resistant), Category::SR);
        assert_eq!(Category::RS.to_string(), "RS");
    }

    #[test]
    fn counts_accumulate_per_category() {
        let mut c = CategoryCounts::default();
        c.add(Category::SS, 1.0);
        c.add(Category::SS, 0.5);
        c.add(Category::SR, 2.0);
        assert_eq!(c.get(Category::SS), 1.5);
        assert_eq!(c.get(Category::RS), 0.0);
        assert_eq!(c.total(), 3.5);
    }
}
