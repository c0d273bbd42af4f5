use serde::{Deserialize, Serialize};
use tracing::warn;

use super::model_trait::Reportable;
use super::ModelRecord;
use crate::expression::{Entity, EntityView, Evaluator};
use crate::network::TopologyView;
use crate::routing::{BranchPolicy, BranchRouter, DecideMode};
use crate::simulator::Services;
use crate::utils::errors::SimulationError;

/// The decide station sends each arriving entity along exactly one of its
/// outgoing paths, as selected by its `BranchPolicy`.  Optionally, the
/// entity takes on a new client type when it leaves along a given path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecideStation {
    id: String,
    #[serde(default)]
    policy: BranchPolicy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    new_client_types: Vec<String>,
    #[serde(default)]
    store_records: bool,
    #[serde(skip)]
    state: State,
}

#[derive(Debug, Clone, Default)]
struct State {
    router: BranchRouter,
    routed: u64,
    records: Vec<ModelRecord>,
}

impl DecideStation {
    pub fn new(id: &str, policy: BranchPolicy, store_records: bool) -> Self {
        Self {
            id: id.to_string(),
            policy,
            new_client_types: Vec::new(),
            store_records,
            state: State::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn policy(&self) -> &BranchPolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut BranchPolicy {
        &mut self.policy
    }

    /// The client type given to entities leaving along `path`, if any.
    pub fn new_client_type(&self, path: usize) -> Option<&str> {
        self.new_client_types
            .get(path)
            .map(String::as_str)
            .filter(|client_type| !client_type.is_empty())
    }

    /// Set the client type for entities leaving along `path`.  An empty
    /// name keeps the client type unchanged.
    pub fn set_new_client_type(&mut self, path: usize, client_type: &str) {
        if self.new_client_types.len() <= path {
            self.new_client_types.resize(path + 1, String::new());
        }
        self.new_client_types[path] = client_type.trim().to_string();
    }

    /// Rename a client type in the policy and in the new client types.
    pub fn rename_client_type(&mut self, old_name: &str, new_name: &str) -> bool {
        let mut renamed = self.policy.rename_client_type(old_name, new_name);
        for client_type in self.new_client_types.iter_mut() {
            if client_type == old_name {
                *client_type = new_name.to_string();
                renamed = true;
            }
        }
        renamed
    }

    /// Describe each outgoing path, including any client type change.
    pub fn path_labels(&self) -> Vec<String> {
        self.policy
            .path_labels()
            .into_iter()
            .enumerate()
            .map(|(path, label)| match self.new_client_type(path) {
                Some(client_type) if label.is_empty() => format!["New type: {}", client_type],
                Some(client_type) => format!["{} / New type: {}", label, client_type],
                None => label,
            })
            .collect()
    }

    /// Check the configuration against the number of outgoing paths, before
    /// a run starts.  Paths whose rate is a literal zero are reported once
    /// here, as they can never be chosen.
    pub fn validate(&self, path_count: usize) -> Result<(), SimulationError> {
        if self.policy.mode() == DecideMode::Chance {
            (0..path_count)
                .filter(|path| self.policy.rate(*path).trim().parse::<f64>() == Ok(0.0))
                .for_each(|path| {
                    warn!(station = %self.id, path, "rate is zero, path cannot be chosen")
                });
        }
        self.policy
            .check_path_count(path_count)
            .and_then(|_| {
                if self.new_client_types.len() > path_count {
                    Err(SimulationError::configuration(
                        "newClientTypes",
                        format![
                            "{} new client types are configured, but there are only {} outgoing paths",
                            self.new_client_types.len(),
                            path_count
                        ],
                    ))
                } else {
                    Ok(())
                }
            })
            .map_err(|error| error.at_station(&self.id))
    }

    /// Clear the run state, restarting any `Sequence` cycle.
    pub fn reset(&mut self) {
        self.state = State::default();
    }

    /// Route an arriving entity, returning the index of its outgoing path.
    pub fn route(
        &mut self,
        entity: &mut Entity,
        network: &dyn TopologyView,
        evaluator: &dyn Evaluator,
        services: &mut Services,
    ) -> Result<usize, SimulationError> {
        let time = services.global_time();
        let path = self
            .state
            .router
            .resolve(
                &self.policy,
                &*entity,
                network,
                evaluator,
                services.uniform_rng(),
            )
            .map_err(|error| error.at_station(&self.id))?;
        self.record(
            time,
            String::from("Arrival"),
            format!["{} ({})", entity.id(), entity.client_type()],
        );
        if let Some(client_type) = self.new_client_type(path) {
            entity.set_client_type(client_type);
        }
        self.state.routed += 1;
        self.record(
            time,
            String::from("Departure"),
            format!["{} on path {}", entity.id(), path + 1],
        );
        Ok(path)
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

impl Reportable for DecideStation {
    fn status(&self) -> String {
        format!["Routed {} by {:?}", self.state.routed, self.policy.mode()]
    }

    fn records(&self) -> &Vec<ModelRecord> {
        &self.state.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::SimpleEvaluator;
    use crate::network::StaticTopology;

    #[test]
    fn leaving_entities_take_the_new_client_type() {
        let mut policy = BranchPolicy::new();
        policy.set_client_types(vec![vec![String::from("Rush")], Vec::new()]);
        let mut station = DecideStation::new("decide-01", policy, true);
        station.set_new_client_type(1, "Standard");
        let network = StaticTopology::with_paths(2);
        let mut services = Services::default();
        let evaluator = SimpleEvaluator::new();

        let mut rush = Entity::new(1, "Rush");
        let mut other = Entity::new(2, "Walk-in");
        assert_eq![station.route(&mut rush, &network, &evaluator, &mut services).unwrap(), 0];
        assert_eq![station.route(&mut other, &network, &evaluator, &mut services).unwrap(), 1];
        assert_eq![rush.client_type(), "Rush"];
        assert_eq![other.client_type(), "Standard"];
        assert_eq![station.records().len(), 4];
        assert_eq![station.records()[3].subject, "2 on path 2"];
        assert_eq![station.status(), "Routed 2 by ClientType"];
    }

    #[test]
    fn errors_name_the_station() {
        let mut policy = BranchPolicy::new();
        policy.set_rates(vec![String::from("Missing"), String::from("1")]);
        let mut station = DecideStation::new("decide-02", policy, false);
        let error = station
            .route(
                &mut Entity::new(1, "A"),
                &StaticTopology::with_paths(2),
                &SimpleEvaluator::new(),
                &mut Services::default(),
            )
            .unwrap_err();
        assert_eq![error.station_id(), Some("decide-02")];
        assert![station.records().is_empty()];
    }

    #[test]
    fn failed_routes_leave_no_arrival_record() {
        let mut policy = BranchPolicy::new();
        policy.set_rates(vec![String::from("Missing"), String::from("1")]);
        let mut station = DecideStation::new("decide-04", policy, true);
        let network = StaticTopology::with_paths(2);
        let mut services = Services::default();
        let mut entity = Entity::new(1, "A");
        assert![station
            .route(&mut entity, &network, &SimpleEvaluator::new(), &mut services)
            .is_err()];
        assert![station.records().is_empty()];
        assert_eq![station.status(), "Routed 0 by Chance"];

        let evaluator = SimpleEvaluator::new().with_variable("Missing", 1.0);
        station
            .route(&mut entity, &network, &evaluator, &mut services)
            .unwrap();
        let actions: Vec<&str> = station
            .records()
            .iter()
            .map(|record| record.action.as_str())
            .collect();
        assert_eq![actions, vec!["Arrival", "Departure"]];
    }

    #[test]
    fn labels_and_renames_cover_new_client_types() {
        let mut policy = BranchPolicy::new();
        policy.set_conditions(vec![String::from("ClientData(1)>2"), String::new()]);
        let mut station = DecideStation::new("decide-03", policy, false);
        station.set_new_client_type(0, "Large");
        assert_eq![
            station.path_labels(),
            vec![String::from("Condition 1 / New type: Large"), String::from("else")]
        ];
        assert![station.rename_client_type("Large", "Bulk")];
        assert_eq![station.new_client_type(0), Some("Bulk")];
        assert![station.validate(2).is_ok()];
        assert_eq![station.validate(1).unwrap_err().station_id(), Some("decide-03")];
    }
}
