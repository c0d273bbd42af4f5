use std::collections::{HashSet, VecDeque};

use tracing::{debug, trace};

use super::policy::{Grouping, MatchProperty, RendezvousPolicy};
use super::queues::InputQueues;
use crate::expression::{EntityView, Evaluator};
use crate::utils::errors::SimulationError;

/// The entities released by one successful match, one from every input, in
/// input order.
#[derive(Debug, Clone, PartialEq)]
pub enum Release<E> {
    /// Released individually and unchanged.
    Individual(Vec<E>),
    /// Released as one group of the given client type; the members keep
    /// their identity.
    Temporary { client_type: String, members: Vec<E> },
    /// Consumed, and replaced by one new entity of the given client type.
    Permanent { client_type: String, consumed: Vec<E> },
}

impl<E> Release<E> {
    pub fn entities(&self) -> &[E] {
        match self {
            Release::Individual(entities) => entities,
            Release::Temporary { members, .. } => members,
            Release::Permanent { consumed, .. } => consumed,
        }
    }

    pub fn into_entities(self) -> Vec<E> {
        match self {
            Release::Individual(entities) => entities,
            Release::Temporary { members, .. } => members,
            Release::Permanent { consumed, .. } => consumed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MatchKey {
    Number(u64),
    Text(String),
}

impl MatchKey {
    /// Numbers match by value, so that `0.0` and `-0.0` are equal.  NaN never
    /// matches.
    fn number(value: f64) -> Option<Self> {
        if value.is_nan() {
            None
        } else if value == 0.0 {
            Some(MatchKey::Number(0.0_f64.to_bits()))
        } else {
            Some(MatchKey::Number(value.to_bits()))
        }
    }
}

/// Test for a releasable match.  `Ok(None)` means not ready, and then no
/// queue is changed.  On success the matched entities are removed from the
/// queues.
///
/// A match needs one waiting entity per input.  When a property must be
/// shared, the candidate values are those present in every input, and the
/// value carried by the earliest qualifying entity of the first input wins;
/// the earliest entity with that value is taken from each input.  Entities
/// without the property never match.
pub fn try_release<E: EntityView>(
    policy: &RendezvousPolicy,
    queues: &mut InputQueues<E>,
    evaluator: &dyn Evaluator,
) -> Result<Option<Release<E>>, SimulationError> {
    if queues.len() != policy.input_count() {
        return Err(SimulationError::configuration(
            "inputCount",
            format![
                "{} input queues are given for a station with {} inputs",
                queues.len(),
                policy.input_count()
            ],
        ));
    }
    if queues.is_empty() || queues.queues().iter().any(VecDeque::is_empty) {
        return Ok(None);
    }
    if let Some(condition) = policy.condition() {
        if !evaluator.evaluate_condition(condition, None)? {
            trace!(condition, "release condition does not hold");
            return Ok(None);
        }
    }
    let positions = match policy.property() {
        MatchProperty::None => Some(vec![0; queues.len()]),
        MatchProperty::Numeric(index) => select_common(queues.queues(), |entity| {
            entity.number_property(*index).and_then(MatchKey::number)
        }),
        MatchProperty::Text(key) => select_common(queues.queues(), |entity| {
            entity
                .text_property(key)
                .map(|value| MatchKey::Text(value.to_string()))
        }),
    };
    let positions = match positions {
        Some(positions) => positions,
        None => {
            trace!("no property value is shared by all inputs");
            return Ok(None);
        }
    };
    let entities = queues.take(&positions);
    debug!(
        released = entities.len(),
        grouping = ?policy.grouping_mode(),
        "rendezvous released"
    );
    Ok(Some(match policy.grouping() {
        Grouping::Collect => Release::Individual(entities),
        Grouping::TemporaryGroup(client_type) => Release::Temporary {
            client_type: client_type.clone(),
            members: entities,
        },
        Grouping::PermanentMerge(client_type) => Release::Permanent {
            client_type: client_type.clone(),
            consumed: entities,
        },
    }))
}

/// The queue positions of the entities to release, or `None` when no value
/// is present in every queue.
fn select_common<E, F>(queues: &[VecDeque<E>], key: F) -> Option<Vec<usize>>
where
    F: Fn(&E) -> Option<MatchKey>,
{
    let (first, others) = queues.split_first()?;
    let present: Vec<HashSet<MatchKey>> = others
        .iter()
        .map(|queue| queue.iter().filter_map(|entity| key(entity)).collect())
        .collect();
    let (first_position, chosen) = first
        .iter()
        .enumerate()
        .filter_map(|(position, entity)| key(entity).map(|value| (position, value)))
        .find(|(_, value)| present.iter().all(|values| values.contains(value)))?;
    let mut positions = vec![first_position];
    for queue in others {
        positions.push(
            queue
                .iter()
                .position(|entity| key(entity).as_ref() == Some(&chosen))?,
        );
    }
    Some(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{Entity, SimpleEvaluator};
    use crate::rendezvous::policy::GroupingMode;

    fn ids(entities: &[Entity]) -> Vec<u64> {
        entities.iter().map(Entity::id).collect()
    }

    #[test]
    fn input_count_mismatch_is_rejected() {
        let policy = RendezvousPolicy::new(3);
        let mut queues: InputQueues<Entity> = InputQueues::new(2);
        assert![matches![
            try_release(&policy, &mut queues, &SimpleEvaluator::new()),
            Err(SimulationError::Configuration { .. })
        ]];
    }

    #[test]
    fn text_values_match_across_three_inputs() {
        let mut policy = RendezvousPolicy::new(3);
        policy.set_text_property("order").unwrap();
        let mut queues = InputQueues::new(3);
        queues.push(0, Entity::new(1, "Frame").with_text("order", "A")).unwrap();
        queues.push(0, Entity::new(2, "Frame").with_text("order", "B")).unwrap();
        queues.push(1, Entity::new(3, "Wheel").with_text("order", "B")).unwrap();
        queues.push(1, Entity::new(4, "Wheel").with_text("order", "A")).unwrap();
        queues.push(2, Entity::new(5, "Seat")).unwrap();
        queues.push(2, Entity::new(6, "Seat").with_text("order", "B")).unwrap();
        let release = try_release(&policy, &mut queues, &SimpleEvaluator::new())
            .unwrap()
            .unwrap();
        assert_eq![ids(release.entities()), vec![2, 3, 6]];
        assert_eq![queues.total_waiting(), 3];
    }

    #[test]
    fn nan_and_missing_values_never_match() {
        let mut policy = RendezvousPolicy::new(2);
        policy.set_numeric_property(1);
        let mut queues = InputQueues::new(2);
        queues.push(0, Entity::new(1, "A").with_number(1, f64::NAN)).unwrap();
        queues.push(1, Entity::new(2, "B").with_number(1, f64::NAN)).unwrap();
        queues.push(1, Entity::new(3, "B")).unwrap();
        let evaluator = SimpleEvaluator::new();
        assert![try_release(&policy, &mut queues, &evaluator).unwrap().is_none()];
        assert_eq![queues.total_waiting(), 3];

        queues.push(0, Entity::new(4, "A").with_number(1, -0.0)).unwrap();
        queues.push(1, Entity::new(5, "B").with_number(1, 0.0)).unwrap();
        let release = try_release(&policy, &mut queues, &evaluator).unwrap().unwrap();
        assert_eq![ids(release.entities()), vec![4, 5]];
    }

    #[test]
    fn release_condition_gates_the_match() {
        let mut policy = RendezvousPolicy::new(2);
        policy.set_condition("Open == 1");
        let mut queues = InputQueues::new(2);
        queues.push(0, Entity::new(1, "A")).unwrap();
        queues.push(1, Entity::new(2, "B")).unwrap();
        let closed = SimpleEvaluator::new().with_variable("Open", 0.0);
        assert![try_release(&policy, &mut queues, &closed).unwrap().is_none()];
        let open = SimpleEvaluator::new().with_variable("Open", 1.0);
        assert![try_release(&policy, &mut queues, &open).unwrap().is_some()];
        assert_eq![queues.total_waiting(), 0];
    }

    #[test]
    fn grouping_shapes_the_release() {
        let mut policy = RendezvousPolicy::new(2);
        policy.set_new_entity_type_name("Kit");
        policy.set_grouping_mode(GroupingMode::TemporaryGroup).unwrap();
        let mut queues = InputQueues::new(2);
        queues.push(0, Entity::new(1, "A")).unwrap();
        queues.push(1, Entity::new(2, "B")).unwrap();
        match try_release(&policy, &mut queues, &SimpleEvaluator::new()).unwrap() {
            Some(Release::Temporary {
                client_type,
                members,
            }) => {
                assert_eq![client_type, "Kit"];
                assert_eq![ids(&members), vec![1, 2]];
            }
            other => panic!("unexpected release {:?}", other),
        }
    }
}
