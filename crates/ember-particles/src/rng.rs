//! Seedable PRNG for particle emission

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub struct ParticleRng {
    inner: SmallRng,
}

impl ParticleRng {
    /// Deterministic stream for a given seed
    pub fn new(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            inner: SmallRng::from_os_rng(),
        }
    }

    /// Returns a float in [0, 1)
    pub fn next_f32(&mut self) -> f32 {
        self.inner.random::<f32>()
    }

    /// Returns `min + r * (max - min)` for `r` in [0, 1).
    /// A degenerate range (`min == max`) always yields `min`.
    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + self.next_f32() * (max - min)
    }
}

impl std::fmt::Debug for ParticleRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleRng").finish_non_exhaustive()
    }
}
