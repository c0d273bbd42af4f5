//! Random variables underpin the stochastic routing behaviors.  Chance
//! routing draws a path from a weighted index distribution, and random
//! tie-breaks draw uniformly among the tied candidates.  Both are wrapped in
//! the enum `Index`.

use rand::distributions::Distribution;
use serde::{Deserialize, Serialize};
use rand_distr::{Uniform, WeightedIndex};

use super::UniformRNG;
use crate::utils::errors::SimulationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Index {
    /// Range is inclusive of min, exclusive of max: [min, max)
    Uniform {
        min: usize,
        max: usize,
    },
    WeightedIndex {
        weights: Vec<f64>,
    },
}

impl Index {
    /// The generation of random variates drives stochastic behaviors during
    /// simulation execution.  This function requires the random number
    /// generator of the simulation, and produces a usize random variate.
    pub fn random_variate(&self, uniform_rng: &mut UniformRNG) -> Result<usize, SimulationError> {
        match self {
            Index::Uniform { min, max } => {
                if min >= max {
                    return Err(SimulationError::configuration(
                        "uniform index",
                        format!["empty range [{}, {})", min, max],
                    ));
                }
                Ok(Uniform::new(*min, *max).sample(uniform_rng.rng()))
            }
            Index::WeightedIndex { weights } => {
                Ok(WeightedIndex::new(weights)?.sample(uniform_rng.rng()))
            }
        }
    }
}
