use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

/// The uniform random number generator of a simulation run.  Every run (and
/// every parallel replication) owns its own generator, so that routing
/// decisions are reproducible for a given seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformRNG {
    rng: Pcg64Mcg,
}

impl Default for UniformRNG {
    fn default() -> Self {
        Self::seeded(42)
    }
}

impl UniformRNG {
    pub fn seeded(seed: u128) -> Self {
        Self {
            rng: Pcg64Mcg::new(seed),
        }
    }

    pub fn rng(&mut self) -> &mut Pcg64Mcg {
        &mut self.rng
    }
}
