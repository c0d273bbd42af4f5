use sim_junction::expression::{Entity, SimpleEvaluator};
use sim_junction::models::{MatchStation, Reportable};
use sim_junction::rendezvous::{try_release, GroupingMode, InputQueues, Release, RendezvousPolicy};
use sim_junction::simulator::Services;
use sim_junction::utils::errors::SimulationError;

fn ids(entities: &[Entity]) -> Vec<u64> {
    entities.iter().map(Entity::id).collect()
}

#[test]
fn heads_are_released_without_a_property() -> Result<(), SimulationError> {
    let policy = RendezvousPolicy::new(2);
    let mut queues = InputQueues::new(2);
    queues.push(0, Entity::new(1, "A"))?;
    queues.push(0, Entity::new(2, "A"))?;
    queues.push(1, Entity::new(3, "B"))?;
    let release = try_release(&policy, &mut queues, &SimpleEvaluator::new())?;
    assert_eq![
        release,
        Some(Release::Individual(vec![Entity::new(1, "A"), Entity::new(3, "B")]))
    ];
    assert_eq![queues.waiting(0), 1];
    Ok(())
}

#[test]
fn numeric_property_values_must_match() -> Result<(), SimulationError> {
    let mut policy = RendezvousPolicy::new(2);
    policy.set_numeric_property(1);
    let evaluator = SimpleEvaluator::new();
    let mut queues = InputQueues::new(2);
    queues.push(0, Entity::new(1, "A").with_number(1, 5.0))?;
    queues.push(0, Entity::new(2, "A").with_number(1, 7.0))?;
    assert![try_release(&policy, &mut queues, &evaluator)?.is_none()];
    assert_eq![queues.waiting(0), 2];

    queues.push(1, Entity::new(3, "B").with_number(1, 7.0))?;
    let release = try_release(&policy, &mut queues, &evaluator)?.unwrap();
    assert_eq![ids(release.entities()), vec![2, 3]];
    assert_eq![
        queues
            .queue(0)
            .map(|queue| queue.iter().map(Entity::id).collect::<Vec<u64>>()),
        Some(vec![1])
    ];
    assert![try_release(&policy, &mut queues, &evaluator)?.is_none()];
    Ok(())
}

#[test]
fn no_common_value_consumes_nothing() -> Result<(), SimulationError> {
    let mut policy = RendezvousPolicy::new(2);
    policy.set_text_property("order")?;
    let mut queues = InputQueues::new(2);
    queues.push(0, Entity::new(1, "A").with_text("order", "X"))?;
    queues.push(1, Entity::new(2, "B").with_text("order", "Y"))?;
    queues.push(1, Entity::new(3, "B"))?;
    assert![try_release(&policy, &mut queues, &SimpleEvaluator::new())?.is_none()];
    assert_eq![queues.total_waiting(), 3];
    Ok(())
}

#[test]
fn permanent_merge_replaces_the_matched_entities() -> Result<(), SimulationError> {
    let mut policy = RendezvousPolicy::new(3);
    policy.set_new_entity_type_name("Bicycle");
    let mut station = MatchStation::new("match-01", policy, false);
    let evaluator = SimpleEvaluator::new();
    let mut services = Services::default();
    services.reserve_entity_ids(100);
    assert![station.arrive(0, Entity::new(1, "Frame"), &evaluator, &mut services)?.is_empty()];
    assert![station.arrive(2, Entity::new(2, "Seat"), &evaluator, &mut services)?.is_empty()];
    assert![station.arrive(2, Entity::new(3, "Seat"), &evaluator, &mut services)?.is_empty()];
    let departures = station.arrive(1, Entity::new(4, "Wheels"), &evaluator, &mut services)?;
    assert_eq![departures, vec![Entity::new(101, "Bicycle")]];
    assert_eq![station.waiting(2), 1];
    assert_eq![station.status(), "Waiting 1, released 1"];
    Ok(())
}

#[test]
fn temporary_groups_keep_their_members() -> Result<(), SimulationError> {
    let mut policy = RendezvousPolicy::new(2);
    policy.set_new_entity_type_name("Pallet");
    policy.set_grouping_mode(GroupingMode::TemporaryGroup)?;
    policy.set_text_property("destination")?;
    let mut station = MatchStation::new("match-02", policy, false);
    let evaluator = SimpleEvaluator::new();
    let mut services = Services::default();
    let box_a = Entity::new(1, "Box").with_text("destination", "Lyon");
    let box_b = Entity::new(2, "Box").with_text("destination", "Turin");
    let crate_b = Entity::new(3, "Crate").with_text("destination", "Turin");
    station.arrive(0, box_a, &evaluator, &mut services)?;
    station.arrive(0, box_b.clone(), &evaluator, &mut services)?;
    let mut departures = station.arrive(1, crate_b.clone(), &evaluator, &mut services)?;
    assert_eq![departures.len(), 1];
    let pallet = departures.remove(0);
    assert![pallet.is_group()];
    assert_eq![MatchStation::ungroup(pallet), vec![box_b, crate_b]];
    assert_eq![station.waiting(0), 1];
    Ok(())
}
