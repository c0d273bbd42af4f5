use serde::{Deserialize, Serialize};

use crate::input_modeling::UniformRNG;

/// The simulator provides a uniform random number generator, simulation
/// clock and entity id allocation to stations during the execution of a
/// simulation.  Each run owns one `Services` instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Services {
    #[serde(skip_serializing, default)]
    uniform_rng: UniformRNG,
    global_time: f64,
    next_entity_id: u64,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            uniform_rng: UniformRNG::default(),
            global_time: 0.0,
            next_entity_id: 1,
        }
    }
}

impl Services {
    /// Services for one replication, with its own random number stream.
    pub fn seeded(seed: u128) -> Self {
        Self {
            uniform_rng: UniformRNG::seeded(seed),
            ..Self::default()
        }
    }

    pub fn uniform_rng(&mut self) -> &mut UniformRNG {
        &mut self.uniform_rng
    }

    pub fn global_time(&self) -> f64 {
        self.global_time
    }

    pub fn set_global_time(&mut self, time: f64) {
        self.global_time = time;
    }

    /// Entities created by stations (merged or grouped entities) draw their
    /// ids from the run, so that ids stay unique within a replication.
    pub fn next_entity_id(&mut self) -> u64 {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    /// Ensure newly allocated ids stay above the ids the engine assigned
    /// itself.
    pub fn reserve_entity_ids(&mut self, highest_used: u64) {
        self.next_entity_id = self.next_entity_id.max(highest_used + 1);
    }
}
