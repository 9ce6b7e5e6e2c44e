use egt_common::TherapyPolicy;
use log::debug;

/// Owns the binary drug concentration of one model and flips it once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TherapyController {
    policy: TherapyPolicy,
    starting_population: usize,
    drug: u8,
}

impl TherapyController {
    pub fn new(policy: TherapyPolicy) -> Self {
        TherapyController { policy, starting_population: 0, drug: policy.initial_concentration() }
    }

    pub fn drug_concentration(&self) -> u8 {
        self.drug
    }

    pub fn starting_population(&self) -> usize {
        self.starting_population
    }

    /// Reference size for the adaptive thresholds, set once the initial layout is placed.
    pub fn set_starting_population(&mut self, n: usize) {
        self.starting_population = n;
    }

    /// Applies the end-of-tick decision and returns the concentration for the next tick.
    ///
    /// Adaptive therapy withdraws drug below `start * (1 - threshold)` and
    /// reinstates it only once the population is back to `start`. Inside that
    /// band the concentration is left as it was.
    pub fn update(&mut self, population: usize) -> u8 {
        let TherapyPolicy::Adaptive { threshold } = self.policy else {
            return self.drug;
        };
        let start = self.starting_population as f64;
        let pop = population as f64;
        let next = if pop < start * (1.0 - threshold) {
            0
        } else if pop >= start {
            1
        } else {
            self.drug
        };
        if next != self.drug {
            debug!("adaptive therapy: population {population} (start {}), drug {} -> {next}", self.starting_population, self.drug);
            self.drug = next;
        }
        self.drug
    }
}
