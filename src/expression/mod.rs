//! The expression module defines what the decision cores can see of an
//! entity, and the seam to the expression evaluator of the surrounding
//! engine.  Rate, condition and release expressions are plain strings in
//! the station configuration; they are evaluated only when a decision is
//! made, against the arriving entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::utils::errors::SimulationError;

pub mod simple;

pub use self::simple::SimpleEvaluator;

/// The read-only view of an arriving or waiting entity.  A property that is
/// not set on the entity is `None` - it is never an error to ask for it.
pub trait EntityView {
    fn client_type(&self) -> &str;
    fn number_property(&self, index: usize) -> Option<f64>;
    fn text_property(&self, key: &str) -> Option<&str>;
    /// Every numeric property that is set, by ascending index.
    fn number_properties(&self) -> Vec<(usize, f64)>;
}

/// The `Evaluator` trait is implemented by the expression engine of the
/// embedding simulation.  Failures are returned as diagnostics, which the
/// routing and rendezvous cores propagate unchanged.
pub trait Evaluator {
    fn evaluate_number(
        &self,
        expression: &str,
        entity: Option<&dyn EntityView>,
    ) -> Result<f64, SimulationError>;

    fn evaluate_condition(
        &self,
        expression: &str,
        entity: Option<&dyn EntityView>,
    ) -> Result<bool, SimulationError>;
}

/// A simulated client, with its numeric properties (addressed by index) and
/// text properties (addressed by key).  A temporary group carries its
/// members, so that they can be recovered later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    id: u64,
    client_type: String,
    #[serde(default)]
    numbers: BTreeMap<usize, f64>,
    #[serde(default)]
    texts: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    members: Vec<Entity>,
}

impl Entity {
    pub fn new(id: u64, client_type: &str) -> Self {
        Self {
            id,
            client_type: client_type.to_string(),
            numbers: BTreeMap::new(),
            texts: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    pub fn with_number(mut self, index: usize, value: f64) -> Self {
        self.numbers.insert(index, value);
        self
    }

    pub fn with_text(mut self, key: &str, value: &str) -> Self {
        self.texts.insert(key.to_string(), value.to_string());
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn set_client_type(&mut self, client_type: &str) {
        self.client_type = client_type.to_string();
    }

    pub fn set_number(&mut self, index: usize, value: f64) {
        self.numbers.insert(index, value);
    }

    pub fn set_text(&mut self, key: &str, value: &str) {
        self.texts.insert(key.to_string(), value.to_string());
    }

    pub fn members(&self) -> &[Entity] {
        &self.members
    }

    pub fn is_group(&self) -> bool {
        !self.members.is_empty()
    }

    pub(crate) fn group(id: u64, client_type: &str, members: Vec<Entity>) -> Self {
        Self {
            members,
            ..Self::new(id, client_type)
        }
    }

    /// Dissolve a temporary group, returning the original entities.  An
    /// entity which is not a group is returned as it is.
    pub fn ungroup(self) -> Vec<Entity> {
        if self.members.is_empty() {
            vec![self]
        } else {
            self.members
        }
    }
}

impl EntityView for Entity {
    fn client_type(&self) -> &str {
        &self.client_type
    }

    fn number_property(&self, index: usize) -> Option<f64> {
        self.numbers.get(&index).copied()
    }

    fn text_property(&self, key: &str) -> Option<&str> {
        self.texts.get(key).map(String::as_str)
    }

    fn number_properties(&self) -> Vec<(usize, f64)> {
        self.numbers.iter().map(|(index, value)| (*index, *value)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_properties_are_none() {
        let entity = Entity::new(1, "Customer")
            .with_number(2, 7.5)
            .with_text("region", "west");
        assert_eq![entity.number_property(2), Some(7.5)];
        assert_eq![entity.number_property(3), None];
        assert_eq![entity.text_property("region"), Some("west")];
        assert_eq![entity.text_property("zone"), None];
        assert_eq![entity.client_type(), "Customer"];
        assert_eq![entity.number_properties(), vec![(2, 7.5)]];
    }

    #[test]
    fn groups_recover_their_members() {
        let members = vec![Entity::new(1, "A"), Entity::new(2, "B")];
        let group = Entity::group(3, "Pair", members.clone());
        assert![group.is_group()];
        assert_eq![group.client_type(), "Pair"];
        assert_eq![group.ungroup(), members];
        assert_eq![Entity::new(4, "C").ungroup(), vec![Entity::new(4, "C")]];
    }
}
