use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::utils::errors::SimulationError;

/// One first-in first-out queue per input of a synchronization station.
/// Unconnected inputs keep an empty queue, which blocks every release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputQueues<E> {
    queues: Vec<VecDeque<E>>,
}

impl<E> Default for InputQueues<E> {
    fn default() -> Self {
        Self { queues: Vec::new() }
    }
}

impl<E> InputQueues<E> {
    pub fn new(input_count: usize) -> Self {
        Self {
            queues: (0..input_count).map(|_| VecDeque::new()).collect(),
        }
    }

    /// The number of inputs.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn push(&mut self, input: usize, entity: E) -> Result<(), SimulationError> {
        let input_count = self.queues.len();
        self.queues
            .get_mut(input)
            .ok_or(SimulationError::InputNotFound { input, input_count })?
            .push_back(entity);
        Ok(())
    }

    pub fn queue(&self, input: usize) -> Option<&VecDeque<E>> {
        self.queues.get(input)
    }

    pub fn waiting(&self, input: usize) -> usize {
        self.queues.get(input).map_or(0, VecDeque::len)
    }

    pub fn total_waiting(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Follow a change of the incoming edges.  Entities waiting at removed
    /// inputs are returned.
    pub fn resize(&mut self, input_count: usize) -> Vec<E> {
        let removed = if input_count < self.queues.len() {
            self.queues.drain(input_count..).flatten().collect()
        } else {
            Vec::new()
        };
        self.queues.resize_with(input_count, VecDeque::new);
        removed
    }

    pub(crate) fn queues(&self) -> &[VecDeque<E>] {
        &self.queues
    }

    /// Take the entity at `positions[input]` from every input.
    pub(crate) fn take(&mut self, positions: &[usize]) -> Vec<E> {
        self.queues
            .iter_mut()
            .zip(positions.iter())
            .filter_map(|(queue, position)| queue.remove(*position))
            .collect()
    }
}
