use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::policy::{BranchPolicy, DecideMode, TieBreak};
use crate::expression::{EntityView, Evaluator};
use crate::input_modeling::{IndexRandomVariable, UniformRNG};
use crate::network::{StationLoad, TopologyView};
use crate::utils::errors::SimulationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Next,
    Process,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metric {
    QueueLength,
    Wip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremum {
    Min,
    Max,
}

/// The `BranchRouter` resolves the outgoing path of an arriving entity.  It
/// is stateless except for the `Sequence` cursor, so each branching station
/// owns one router per simulation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRouter {
    sequence_path: usize,
    sequence_emitted: u32,
}

impl BranchRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart the `Sequence` cycle at the first path.
    pub fn reset(&mut self) {
        self.sequence_path = 0;
        self.sequence_emitted = 0;
    }

    /// Select the outgoing path for `entity`.  The returned index is always
    /// below `network.path_count()`.  Expression failures are propagated
    /// unchanged.
    pub fn resolve(
        &mut self,
        policy: &BranchPolicy,
        entity: &dyn EntityView,
        network: &dyn TopologyView,
        evaluator: &dyn Evaluator,
        uniform_rng: &mut UniformRNG,
    ) -> Result<usize, SimulationError> {
        let path_count = network.path_count();
        policy.check_path_count(path_count)?;
        let tie_break = policy.tie_break();
        let path = match policy.mode() {
            DecideMode::Chance => by_chance(policy, entity, evaluator, path_count, uniform_rng),
            DecideMode::Condition => by_condition(policy, entity, evaluator, path_count),
            DecideMode::ClientType => Ok(by_client_type(policy, entity, path_count)),
            DecideMode::Sequence => Ok(self.by_sequence(policy, path_count)),
            DecideMode::KeyValue => Ok(by_key_value(policy, entity, path_count)),
            DecideMode::ShortestQueueNext => by_station_load(
                network,
                (Target::Next, Metric::QueueLength, Extremum::Min),
                tie_break,
                uniform_rng,
            ),
            DecideMode::ShortestQueueProcess => by_station_load(
                network,
                (Target::Process, Metric::QueueLength, Extremum::Min),
                tie_break,
                uniform_rng,
            ),
            DecideMode::MinClientsNext => by_station_load(
                network,
                (Target::Next, Metric::Wip, Extremum::Min),
                tie_break,
                uniform_rng,
            ),
            DecideMode::MinClientsProcess => by_station_load(
                network,
                (Target::Process, Metric::Wip, Extremum::Min),
                tie_break,
                uniform_rng,
            ),
            DecideMode::LongestQueueNext => by_station_load(
                network,
                (Target::Next, Metric::QueueLength, Extremum::Max),
                tie_break,
                uniform_rng,
            ),
            DecideMode::LongestQueueProcess => by_station_load(
                network,
                (Target::Process, Metric::QueueLength, Extremum::Max),
                tie_break,
                uniform_rng,
            ),
            DecideMode::MaxClientsNext => by_station_load(
                network,
                (Target::Next, Metric::Wip, Extremum::Max),
                tie_break,
                uniform_rng,
            ),
            DecideMode::MaxClientsProcess => by_station_load(
                network,
                (Target::Process, Metric::Wip, Extremum::Max),
                tie_break,
                uniform_rng,
            ),
        }?;
        debug!(
            mode = ?policy.mode(),
            client_type = entity.client_type(),
            path,
            "routed entity"
        );
        Ok(path)
    }

    fn by_sequence(&mut self, policy: &BranchPolicy, path_count: usize) -> usize {
        if self.sequence_path >= path_count {
            self.reset();
        }
        let path = self.sequence_path;
        self.sequence_emitted += 1;
        if self.sequence_emitted >= policy.multiplicity(path) {
            self.sequence_path = (path + 1) % path_count;
            self.sequence_emitted = 0;
        }
        path
    }
}

fn by_chance(
    policy: &BranchPolicy,
    entity: &dyn EntityView,
    evaluator: &dyn Evaluator,
    path_count: usize,
    uniform_rng: &mut UniformRNG,
) -> Result<usize, SimulationError> {
    let weights = (0..path_count)
        .map(|path| {
            let rate = policy.rate(path);
            if rate.trim().is_empty() {
                return Err(SimulationError::configuration(
                    "rate",
                    format!["path {} has an empty rate", path + 1],
                ));
            }
            let weight = evaluator.evaluate_number(rate, Some(entity))?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(SimulationError::configuration(
                    "rate",
                    format!["rate \"{}\" of path {} evaluated to {}", rate, path + 1, weight],
                ));
            }
            trace!(path, weight, "evaluated rate");
            Ok(weight)
        })
        .collect::<Result<Vec<f64>, SimulationError>>()?;
    if weights.iter().all(|weight| *weight == 0.0) {
        return Err(SimulationError::configuration(
            "rate",
            "all rates evaluated to zero",
        ));
    }
    if !weights.iter().sum::<f64>().is_finite() {
        return Err(SimulationError::configuration(
            "rate",
            "the sum of the rates is not finite",
        ));
    }
    IndexRandomVariable::WeightedIndex { weights }.random_variate(uniform_rng)
}

fn by_condition(
    policy: &BranchPolicy,
    entity: &dyn EntityView,
    evaluator: &dyn Evaluator,
    path_count: usize,
) -> Result<usize, SimulationError> {
    for path in 0..path_count - 1 {
        match policy.condition(path) {
            None => return Ok(path),
            Some(condition) if condition.trim().is_empty() => {
                return Err(SimulationError::configuration(
                    "condition",
                    format!["path {} has an empty condition", path + 1],
                ))
            }
            Some(condition) => {
                let holds = evaluator.evaluate_condition(condition, Some(entity))?;
                trace!(path, condition, holds, "evaluated condition");
                if holds {
                    return Ok(path);
                }
            }
        }
    }
    Ok(path_count - 1)
}

fn by_client_type(policy: &BranchPolicy, entity: &dyn EntityView, path_count: usize) -> usize {
    let client_type = entity.client_type();
    (0..path_count - 1)
        .find(|path| {
            policy
                .client_types(*path)
                .iter()
                .any(|candidate| candidate == client_type)
        })
        .unwrap_or(path_count - 1)
}

fn by_key_value(policy: &BranchPolicy, entity: &dyn EntityView, path_count: usize) -> usize {
    match entity.text_property(policy.key()) {
        Some(value) => (0..path_count - 1)
            .find(|path| policy.value_matches(*path, value))
            .unwrap_or(path_count - 1),
        None => {
            trace!(key = policy.key(), "property not set, taking the default path");
            path_count - 1
        }
    }
}

fn by_station_load(
    network: &dyn TopologyView,
    (target, metric, extremum): (Target, Metric, Extremum),
    tie_break: TieBreak,
    uniform_rng: &mut UniformRNG,
) -> Result<usize, SimulationError> {
    let candidates: Vec<(usize, usize)> = (0..network.path_count())
        .filter_map(|path| {
            let station: Option<StationLoad> = match target {
                Target::Next => network.next_station(path),
                Target::Process => network.next_process_station(path),
            };
            station.map(|station| {
                let load = match metric {
                    Metric::QueueLength => station.queue_length,
                    Metric::Wip => station.wip,
                };
                trace!(path, station = %station.station_id, load, "candidate station");
                (path, load)
            })
        })
        .collect();
    let best = match extremum {
        Extremum::Min => candidates.iter().map(|(_, load)| *load).min(),
        Extremum::Max => candidates.iter().map(|(_, load)| *load).max(),
    }
    .ok_or_else(|| {
        SimulationError::configuration(
            "mode",
            "no outgoing path leads to a station whose load can be compared",
        )
    })?;
    let tied: Vec<usize> = candidates
        .iter()
        .filter(|(_, load)| *load == best)
        .map(|(path, _)| *path)
        .collect();
    let pick = match tie_break {
        TieBreak::First => 0,
        TieBreak::Last => tied.len() - 1,
        TieBreak::Random if tied.len() == 1 => 0,
        TieBreak::Random => IndexRandomVariable::Uniform {
            min: 0,
            max: tied.len(),
        }
        .random_variate(uniform_rng)?,
    };
    Ok(tied[pick])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{Entity, SimpleEvaluator};
    use crate::network::StaticTopology;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn route(
        router: &mut BranchRouter,
        policy: &BranchPolicy,
        entity: &Entity,
        network: &StaticTopology,
    ) -> Result<usize, SimulationError> {
        router.resolve(
            policy,
            entity,
            network,
            &SimpleEvaluator::new(),
            &mut UniformRNG::default(),
        )
    }

    fn queues(lengths: &[usize]) -> StaticTopology {
        StaticTopology::from_stations(
            lengths
                .iter()
                .enumerate()
                .map(|(index, length)| StationLoad::new(&format!["process-{:02}", index], *length, 0))
                .collect(),
        )
    }

    #[test]
    fn zero_paths_are_rejected() {
        let policy = BranchPolicy::new();
        let result = route(
            &mut BranchRouter::new(),
            &policy,
            &Entity::new(1, "A"),
            &StaticTopology::new(),
        );
        assert![matches![result, Err(SimulationError::Configuration { .. })]];
    }

    #[test]
    fn single_path_is_always_taken() {
        let mut policy = BranchPolicy::new();
        policy.set_conditions(strings(&["Unknown > 1"]));
        let path = route(
            &mut BranchRouter::new(),
            &policy,
            &Entity::new(1, "A"),
            &StaticTopology::with_paths(1),
        )
        .unwrap();
        assert_eq![path, 0];
    }

    #[test]
    fn negative_and_zero_rates_are_rejected() {
        let mut policy = BranchPolicy::new();
        let network = StaticTopology::with_paths(2);
        let entity = Entity::new(1, "A");
        policy.set_rates(strings(&["1", "-1"]));
        assert![route(&mut BranchRouter::new(), &policy, &entity, &network).is_err()];
        policy.set_rates(strings(&["0", "0"]));
        assert![route(&mut BranchRouter::new(), &policy, &entity, &network).is_err()];
        policy.set_rates(strings(&["0", "2"]));
        assert_eq![route(&mut BranchRouter::new(), &policy, &entity, &network).unwrap(), 1];
    }

    #[test]
    fn rates_must_sum_to_a_finite_weight() {
        let mut policy = BranchPolicy::new();
        let network = StaticTopology::with_paths(2);
        let entity = Entity::new(1, "A");
        policy.set_rates(strings(&["10^308", "10^308"]));
        assert![matches![
            route(&mut BranchRouter::new(), &policy, &entity, &network),
            Err(SimulationError::Configuration { .. })
        ]];

        policy.set_rates(strings(&["Huge", "1"]));
        let evaluator = SimpleEvaluator::new().with_variable("Huge", f64::INFINITY);
        assert![matches![
            BranchRouter::new().resolve(
                &policy,
                &entity,
                &network,
                &evaluator,
                &mut UniformRNG::default()
            ),
            Err(SimulationError::Configuration { .. })
        ]];
    }

    #[test]
    fn missing_condition_matches_and_blank_condition_fails() {
        let mut policy = BranchPolicy::new();
        policy.set_conditions(strings(&["ClientData(1)>5"]));
        let entity = Entity::new(1, "A").with_number(1, 2.0);
        let path = route(
            &mut BranchRouter::new(),
            &policy,
            &entity,
            &StaticTopology::with_paths(3),
        )
        .unwrap();
        assert_eq![path, 1];
        policy.set_conditions(strings(&[" ", ""]));
        assert![route(
            &mut BranchRouter::new(),
            &policy,
            &entity,
            &StaticTopology::with_paths(2)
        )
        .is_err()];
    }

    #[test]
    fn sequence_wraps_after_path_count_change() {
        let mut policy = BranchPolicy::new();
        policy.set_multiplicities(vec![1, 1, 1]).unwrap();
        let mut router = BranchRouter::new();
        let entity = Entity::new(1, "A");
        let three = StaticTopology::with_paths(3);
        let two = StaticTopology::with_paths(2);
        assert_eq![route(&mut router, &policy, &entity, &three).unwrap(), 0];
        assert_eq![route(&mut router, &policy, &entity, &three).unwrap(), 1];
        assert_eq![route(&mut router, &policy, &entity, &three).unwrap(), 2];
        policy.set_path_count(2);
        assert_eq![route(&mut router, &policy, &entity, &two).unwrap(), 0];
        assert_eq![route(&mut router, &policy, &entity, &two).unwrap(), 1];
        router.reset();
        assert_eq![route(&mut router, &policy, &entity, &two).unwrap(), 0];
    }

    #[test]
    fn load_ties_follow_the_tie_break() {
        let mut policy = BranchPolicy::with_mode(DecideMode::LongestQueueNext, 4);
        let network = queues(&[2, 5, 1, 5]);
        let entity = Entity::new(1, "A");
        policy.set_tie_break(TieBreak::First);
        assert_eq![route(&mut BranchRouter::new(), &policy, &entity, &network).unwrap(), 1];
        policy.set_tie_break(TieBreak::Last);
        assert_eq![route(&mut BranchRouter::new(), &policy, &entity, &network).unwrap(), 3];
        policy.set_tie_break(TieBreak::Random);
        let path = route(&mut BranchRouter::new(), &policy, &entity, &network).unwrap();
        assert![path == 1 || path == 3];
    }

    #[test]
    fn paths_without_stations_are_not_candidates() {
        let policy = BranchPolicy::with_mode(DecideMode::ShortestQueueProcess, 3);
        let mut network = StaticTopology::new();
        network.add_path(Some(StationLoad::new("sink", 0, 0)), None);
        network.add_path(None, Some(StationLoad::new("process-01", 4, 1)));
        network.add_path(None, Some(StationLoad::new("process-02", 3, 1)));
        let entity = Entity::new(1, "A");
        assert_eq![route(&mut BranchRouter::new(), &policy, &entity, &network).unwrap(), 2];

        let policy = BranchPolicy::with_mode(DecideMode::MaxClientsProcess, 2);
        let network = StaticTopology::with_paths(2);
        assert![matches![
            route(&mut BranchRouter::new(), &policy, &entity, &network),
            Err(SimulationError::Configuration { .. })
        ]];
    }

    #[test]
    fn wip_modes_read_the_client_count() {
        let mut network = StaticTopology::new();
        network.add_path(Some(StationLoad::new("a", 0, 7)), None);
        network.add_path(Some(StationLoad::new("b", 9, 2)), None);
        let entity = Entity::new(1, "A");
        let policy = BranchPolicy::with_mode(DecideMode::MinClientsNext, 2);
        assert_eq![route(&mut BranchRouter::new(), &policy, &entity, &network).unwrap(), 1];
        let policy = BranchPolicy::with_mode(DecideMode::MaxClientsNext, 2);
        assert_eq![route(&mut BranchRouter::new(), &policy, &entity, &network).unwrap(), 0];
    }

    #[test]
    fn client_type_falls_back_to_the_last_path() {
        let mut policy = BranchPolicy::new();
        policy.set_client_types(vec![strings(&["A"]), strings(&["B", "C"]), strings(&["C"])]);
        let network = StaticTopology::with_paths(3);
        let mut router = BranchRouter::new();
        assert_eq![route(&mut router, &policy, &Entity::new(1, "C"), &network).unwrap(), 1];
        assert_eq![route(&mut router, &policy, &Entity::new(2, "D"), &network).unwrap(), 2];
    }
}
