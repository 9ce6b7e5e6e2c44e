use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Seeded random source owned by one model run.
///
/// Every stochastic decision of a run draws from a single instance, so a run is
/// reproducible from its seed alone.
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: StdRng,
}

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        SimRng { inner: StdRng::seed_from_u64(seed) }
    }

    /// Uniform double in `[0, 1)`.
    #[inline(always)]
    pub fn double(&mut self) -> f64 {
        self.inner.random::<f64>()
    }

    /// Uniform integer in `[0, bound)`. `bound` must be non-zero.
    #[inline(always)]
    pub fn int(&mut self, bound: usize) -> usize {
        self.inner.random_range(0..bound)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }
}
