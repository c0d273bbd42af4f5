use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model_trait::Reportable;
use super::ModelRecord;
use crate::expression::{Entity, EntityView, Evaluator};
use crate::rendezvous::{try_release, InputQueues, Release, RendezvousPolicy};
use crate::simulator::Services;
use crate::utils::errors::SimulationError;

/// The match station holds arriving entities until one entity from each
/// input can leave together.  Matched entities leave unchanged, as one
/// temporary group, or merged into one new entity, as set by the
/// `RendezvousPolicy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStation {
    id: String,
    #[serde(default)]
    policy: RendezvousPolicy,
    #[serde(default)]
    store_records: bool,
    #[serde(skip)]
    state: State,
}

#[derive(Debug, Clone, Default)]
struct State {
    queues: InputQueues<Entity>,
    released: u64,
    records: Vec<ModelRecord>,
}

impl MatchStation {
    pub fn new(id: &str, policy: RendezvousPolicy, store_records: bool) -> Self {
        let queues = InputQueues::new(policy.input_count());
        Self {
            id: id.to_string(),
            policy,
            store_records,
            state: State {
                queues,
                ..State::default()
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn policy(&self) -> &RendezvousPolicy {
        &self.policy
    }

    pub fn waiting(&self, input: usize) -> usize {
        self.state.queues.waiting(input)
    }

    /// Follow a change of the incoming edges.  Entities waiting at removed
    /// inputs are returned to the caller.
    pub fn set_input_count(&mut self, input_count: usize) -> Vec<Entity> {
        self.policy.set_input_count(input_count);
        self.state.queues.resize(input_count)
    }

    /// Replace the policy, keeping the waiting entities of inputs that
    /// still exist.
    pub fn set_policy(&mut self, policy: RendezvousPolicy) -> Vec<Entity> {
        let input_count = policy.input_count();
        self.policy = policy;
        self.state.queues.resize(input_count)
    }

    /// Clear the run state, dropping all waiting entities.
    pub fn reset(&mut self) {
        self.state = State {
            queues: InputQueues::new(self.policy.input_count()),
            ..State::default()
        };
    }

    /// Enqueue an entity at `input`, and release every match that became
    /// possible.
    pub fn arrive(
        &mut self,
        input: usize,
        entity: Entity,
        evaluator: &dyn Evaluator,
        services: &mut Services,
    ) -> Result<Vec<Entity>, SimulationError> {
        self.policy
            .validate()
            .map_err(|error| error.at_station(&self.id))?;
        self.align_inputs();
        let subject = format!["{} ({}) on input {}", entity.id(), entity.client_type(), input + 1];
        self.state
            .queues
            .push(input, entity)
            .map_err(|error| error.at_station(&self.id))?;
        self.record(services.global_time(), String::from("Arrival"), subject);
        self.release(evaluator, services)
    }

    /// Test again for matches, after a change of global state that the
    /// release condition may depend on.
    pub fn retry(
        &mut self,
        evaluator: &dyn Evaluator,
        services: &mut Services,
    ) -> Result<Vec<Entity>, SimulationError> {
        self.align_inputs();
        self.release(evaluator, services)
    }

    /// Recover the members of a temporary group released by a match
    /// station.  Other entities are returned as they are.
    pub fn ungroup(group: Entity) -> Vec<Entity> {
        group.ungroup()
    }

    fn align_inputs(&mut self) {
        if self.state.queues.len() != self.policy.input_count() {
            self.state.queues = InputQueues::new(self.policy.input_count());
        }
    }

    fn release(
        &mut self,
        evaluator: &dyn Evaluator,
        services: &mut Services,
    ) -> Result<Vec<Entity>, SimulationError> {
        let mut departures = Vec::new();
        loop {
            let release = match try_release(&self.policy, &mut self.state.queues, evaluator) {
                Ok(Some(release)) => release,
                Ok(None) => break,
                Err(error) => return Err(error.at_station(&self.id)),
            };
            self.state.released += 1;
            let time = services.global_time();
            match release {
                Release::Individual(entities) => departures.extend(entities),
                Release::Temporary {
                    client_type,
                    members,
                } => {
                    let numbers = self.transferred_numbers(&members);
                    let mut group = Entity::group(services.next_entity_id(), &client_type, members);
                    for (index, value) in numbers {
                        group.set_number(index, value);
                    }
                    departures.push(group);
                }
                Release::Permanent {
                    client_type,
                    consumed,
                } => {
                    for entity in consumed.iter() {
                        self.record(time, String::from("Dispose"), entity.id().to_string());
                    }
                    let mut merged = Entity::new(services.next_entity_id(), &client_type);
                    for (index, value) in self.transferred_numbers(&consumed) {
                        merged.set_number(index, value);
                    }
                    departures.push(merged);
                }
            }
        }
        for entity in departures.iter() {
            self.record(
                services.global_time(),
                String::from("Departure"),
                format!["{} ({})", entity.id(), entity.client_type()],
            );
        }
        Ok(departures)
    }

    /// Combine the numeric properties of matched entities by index, as set
    /// by the policy's transfer mode.
    fn transferred_numbers(&self, entities: &[Entity]) -> Vec<(usize, f64)> {
        let mut values: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
        for entity in entities {
            for (index, value) in entity.number_properties() {
                values.entry(index).or_default().push(value);
            }
        }
        let mode = self.policy.transfer_numbers();
        values
            .into_iter()
            .filter_map(|(index, values)| mode.combine(&values).map(|value| (index, value)))
            .collect()
    }

    fn record(&mut self, time: f64, action: String, subject: String) {
        if self.store_records {
            self.state.records.push(ModelRecord {
                time,
                action,
                subject,
            });
        }
    }
}

impl Reportable for MatchStation {
    fn status(&self) -> String {
        format![
            "Waiting {}, released {}",
            self.state.queues.total_waiting(),
            self.state.released
        ]
    }

    fn records(&self) -> &Vec<ModelRecord> {
        &self.state.records
    }
}
