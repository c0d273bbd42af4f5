use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::utils::errors::SimulationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyMode {
    None,
    Numeric,
    Text,
}

impl Default for PropertyMode {
    fn default() -> Self {
        PropertyMode::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupingMode {
    Collect,
    TemporaryGroup,
    PermanentMerge,
}

impl Default for GroupingMode {
    fn default() -> Self {
        GroupingMode::Collect
    }
}

/// How the numeric properties of matched entities carry over to a group or
/// merged entity.  Each property index is combined over the matched
/// entities that carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferMode {
    Off,
    Min,
    Max,
    Mean,
    Sum,
    Multiply,
}

impl Default for TransferMode {
    fn default() -> Self {
        TransferMode::Off
    }
}

impl TransferMode {
    /// Combine the values of one property index.  `None` when nothing is
    /// transferred.
    pub fn combine(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        match self {
            TransferMode::Off => None,
            TransferMode::Min => values.iter().copied().reduce(f64::min),
            TransferMode::Max => values.iter().copied().reduce(f64::max),
            TransferMode::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
            TransferMode::Sum => Some(values.iter().sum()),
            TransferMode::Multiply => Some(values.iter().product()),
        }
    }
}

/// Which property the waiting entities of all inputs must share to be
/// released together.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchProperty {
    None,
    Numeric(usize),
    Text(String),
}

/// How a matched set of entities leaves the station.  Grouping variants
/// carry the client type of the created entity, which is never empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Grouping {
    Collect,
    TemporaryGroup(String),
    PermanentMerge(String),
}

/// The `RendezvousPolicy` is the configuration of a synchronization station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RendezvousPolicyRepr", into = "RendezvousPolicyRepr")]
pub struct RendezvousPolicy {
    input_count: usize,
    property: MatchProperty,
    grouping: Grouping,
    condition: Option<String>,
    transfer_numbers: TransferMode,
}

impl Default for RendezvousPolicy {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RendezvousPolicy {
    pub fn new(input_count: usize) -> Self {
        Self {
            input_count,
            property: MatchProperty::None,
            grouping: Grouping::Collect,
            condition: None,
            transfer_numbers: TransferMode::Off,
        }
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn property(&self) -> &MatchProperty {
        &self.property
    }

    pub fn property_mode(&self) -> PropertyMode {
        match self.property {
            MatchProperty::None => PropertyMode::None,
            MatchProperty::Numeric(_) => PropertyMode::Numeric,
            MatchProperty::Text(_) => PropertyMode::Text,
        }
    }

    pub fn grouping(&self) -> &Grouping {
        &self.grouping
    }

    pub fn grouping_mode(&self) -> GroupingMode {
        match self.grouping {
            Grouping::Collect => GroupingMode::Collect,
            Grouping::TemporaryGroup(_) => GroupingMode::TemporaryGroup,
            Grouping::PermanentMerge(_) => GroupingMode::PermanentMerge,
        }
    }

    /// The client type of grouped or merged entities; empty for `Collect`.
    pub fn new_entity_type_name(&self) -> &str {
        match &self.grouping {
            Grouping::Collect => "",
            Grouping::TemporaryGroup(name) | Grouping::PermanentMerge(name) => name,
        }
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn transfer_numbers(&self) -> TransferMode {
        self.transfer_numbers
    }

    /// Follow a change of the incoming edges.
    pub fn set_input_count(&mut self, input_count: usize) {
        self.input_count = input_count;
    }

    pub fn set_property_none(&mut self) {
        self.property = MatchProperty::None;
    }

    pub fn set_numeric_property(&mut self, index: usize) {
        self.property = MatchProperty::Numeric(index);
    }

    pub fn set_text_property(&mut self, key: &str) -> Result<(), SimulationError> {
        if key.trim().is_empty() {
            return Err(SimulationError::configuration(
                "propertyKey",
                "matching by text property requires a property key",
            ));
        }
        self.property = MatchProperty::Text(key.to_string());
        Ok(())
    }

    /// Switch the grouping mode, keeping the current type name.  Grouping
    /// modes other than `Collect` need a type name to be set first.
    pub fn set_grouping_mode(&mut self, mode: GroupingMode) -> Result<(), SimulationError> {
        let name = self.new_entity_type_name().to_string();
        self.grouping = match mode {
            GroupingMode::Collect => Grouping::Collect,
            _ if name.is_empty() => {
                return Err(SimulationError::configuration(
                    "newEntityTypeName",
                    format!["grouping mode {:?} requires a new entity type name", mode],
                ))
            }
            GroupingMode::TemporaryGroup => Grouping::TemporaryGroup(name),
            GroupingMode::PermanentMerge => Grouping::PermanentMerge(name),
        };
        Ok(())
    }

    /// Set the client type of grouped or merged entities.  An empty name
    /// switches to `Collect`, and a name given while collecting switches to
    /// `PermanentMerge`.
    pub fn set_new_entity_type_name(&mut self, name: &str) {
        let name = name.trim();
        self.grouping = match &self.grouping {
            _ if name.is_empty() => Grouping::Collect,
            Grouping::TemporaryGroup(_) => Grouping::TemporaryGroup(name.to_string()),
            Grouping::Collect | Grouping::PermanentMerge(_) => {
                Grouping::PermanentMerge(name.to_string())
            }
        };
    }

    pub fn set_grouping(&mut self, grouping: Grouping) -> Result<(), SimulationError> {
        let unnamed = match &grouping {
            Grouping::Collect => false,
            Grouping::TemporaryGroup(name) | Grouping::PermanentMerge(name) => {
                name.trim().is_empty()
            }
        };
        if unnamed {
            return Err(SimulationError::configuration(
                "newEntityTypeName",
                "grouped and merged entities require a client type",
            ));
        }
        self.grouping = grouping;
        Ok(())
    }

    /// A blank release condition removes the condition.
    pub fn set_condition(&mut self, condition: &str) {
        self.condition = Some(condition.trim())
            .filter(|condition| !condition.is_empty())
            .map(str::to_string);
    }

    /// Only grouped and merged entities receive transferred numbers.
    pub fn set_transfer_numbers(&mut self, mode: TransferMode) {
        self.transfer_numbers = mode;
    }

    /// Check that the station can ever release: it needs at least two
    /// inputs.
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.input_count < 2 {
            return Err(SimulationError::configuration(
                "inputCount",
                format![
                    "a rendezvous needs at least 2 inputs, but {} are connected",
                    self.input_count
                ],
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum PropertyKey {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RendezvousPolicyRepr {
    input_count: usize,
    property_mode: PropertyMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    property_key: Option<PropertyKey>,
    grouping_mode: GroupingMode,
    #[serde(skip_serializing_if = "String::is_empty")]
    new_entity_type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<String>,
    transfer_numbers: TransferMode,
}

impl TryFrom<RendezvousPolicyRepr> for RendezvousPolicy {
    type Error = SimulationError;

    fn try_from(repr: RendezvousPolicyRepr) -> Result<Self, Self::Error> {
        let property = match (repr.property_mode, repr.property_key) {
            (PropertyMode::None, _) => MatchProperty::None,
            (PropertyMode::Numeric, None) => MatchProperty::Numeric(0),
            (PropertyMode::Numeric, Some(PropertyKey::Index(index))) => {
                MatchProperty::Numeric(index)
            }
            (PropertyMode::Numeric, Some(PropertyKey::Name(name))) => {
                MatchProperty::Numeric(name.trim().parse::<usize>().map_err(|_| {
                    SimulationError::configuration(
                        "propertyKey",
                        format!["\"{}\" is not a numeric property index", name],
                    )
                })?)
            }
            (PropertyMode::Text, Some(PropertyKey::Name(name))) if !name.trim().is_empty() => {
                MatchProperty::Text(name)
            }
            (PropertyMode::Text, Some(PropertyKey::Index(index))) => {
                MatchProperty::Text(index.to_string())
            }
            (PropertyMode::Text, _) => {
                return Err(SimulationError::configuration(
                    "propertyKey",
                    "matching by text property requires a property key",
                ))
            }
        };
        let name = repr.new_entity_type_name.trim().to_string();
        let grouping = match repr.grouping_mode {
            _ if name.is_empty() => Grouping::Collect,
            GroupingMode::Collect => Grouping::Collect,
            GroupingMode::TemporaryGroup => Grouping::TemporaryGroup(name),
            GroupingMode::PermanentMerge => Grouping::PermanentMerge(name),
        };
        let mut policy = Self {
            input_count: repr.input_count,
            property,
            grouping,
            condition: None,
            transfer_numbers: repr.transfer_numbers,
        };
        if let Some(condition) = repr.condition {
            policy.set_condition(&condition);
        }
        Ok(policy)
    }
}

impl From<RendezvousPolicy> for RendezvousPolicyRepr {
    fn from(policy: RendezvousPolicy) -> Self {
        let property_mode = policy.property_mode();
        let grouping_mode = policy.grouping_mode();
        let property_key = match policy.property {
            MatchProperty::None => None,
            MatchProperty::Numeric(index) => Some(PropertyKey::Index(index)),
            MatchProperty::Text(key) => Some(PropertyKey::Name(key)),
        };
        let new_entity_type_name = match policy.grouping {
            Grouping::Collect => String::new(),
            Grouping::TemporaryGroup(name) | Grouping::PermanentMerge(name) => name,
        };
        Self {
            input_count: policy.input_count,
            property_mode,
            property_key,
            grouping_mode,
            new_entity_type_name,
            condition: policy.condition,
            transfer_numbers: policy.transfer_numbers,
        }
    }
}
