//! Explicit generator state.
//!
//! Nothing in the engine touches a global generator. Every node owns an
//! [`RngState`] seeded from its recorded seed; the root's seed is the root
//! seed, and child seeds are drawn from the parent's state.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// A seeded generator that remembers the seed it started from.
///
/// Reproducibility is pinned to `rand` 0.8's `StdRng`; changing that
/// dependency changes every recorded trace.
#[derive(Clone, Debug)]
pub struct RngState {
    seed: u64,
    rng: StdRng,
}

impl RngState {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed this state was created from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw a seed for a derived generator.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Uniform draw in `[0, 1)`.
    pub fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform draw in `[lower, upper]`. Always consumes exactly one draw,
    /// also for degenerate ranges.
    pub fn uniform(&mut self, lower: f64, upper: f64) -> f64 {
        let (lo, hi) = if lower <= upper {
            (lower, upper)
        } else {
            (upper, lower)
        };
        let t = self.unit();
        (lo * (1.0 - t) + hi * t).max(lo).min(hi)
    }

    /// Uniform integer draw in `[lower, upper]`.
    pub fn between(&mut self, lower: u32, upper: u32) -> u32 {
        if lower >= upper {
            return lower;
        }
        self.rng.gen_range(lower..=upper)
    }
}

impl RngCore for RngState {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}
