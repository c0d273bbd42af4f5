use std::convert::TryFrom;

use serde::{Deserialize, Serialize};

use crate::utils::errors::SimulationError;
use crate::utils::{join_values, split_values};

/// The decision rule of a branching station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecideMode {
    Chance,
    Condition,
    ClientType,
    Sequence,
    ShortestQueueNext,
    ShortestQueueProcess,
    MinClientsNext,
    MinClientsProcess,
    LongestQueueNext,
    LongestQueueProcess,
    MaxClientsNext,
    MaxClientsProcess,
    KeyValue,
}

impl Default for DecideMode {
    fn default() -> Self {
        DecideMode::Chance
    }
}

impl DecideMode {
    /// The eight modes which decide by the current load of the downstream
    /// stations, and carry no per-path data.
    pub fn uses_station_load(self) -> bool {
        matches![
            self,
            DecideMode::ShortestQueueNext
                | DecideMode::ShortestQueueProcess
                | DecideMode::MinClientsNext
                | DecideMode::MinClientsProcess
                | DecideMode::LongestQueueNext
                | DecideMode::LongestQueueProcess
                | DecideMode::MaxClientsNext
                | DecideMode::MaxClientsProcess
        ]
    }

    fn default_option(self) -> DecideOption {
        match self {
            DecideMode::Chance => DecideOption::Rate(String::from("1")),
            DecideMode::Condition => DecideOption::Condition(String::new()),
            DecideMode::ClientType => DecideOption::ClientTypes(Vec::new()),
            DecideMode::Sequence => DecideOption::Multiplicity(1),
            DecideMode::KeyValue => DecideOption::Value(String::new()),
            _ => DecideOption::Unconfigured,
        }
    }

    fn accepts(self, option: &DecideOption) -> bool {
        match option {
            DecideOption::Rate(_) => self == DecideMode::Chance,
            DecideOption::Condition(_) => self == DecideMode::Condition,
            DecideOption::ClientTypes(_) => self == DecideMode::ClientType,
            DecideOption::Multiplicity(_) => self == DecideMode::Sequence,
            DecideOption::Value(_) => self == DecideMode::KeyValue,
            DecideOption::Unconfigured => self.uses_station_load(),
        }
    }
}

/// How to choose among equally loaded downstream stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreak {
    Random,
    First,
    Last,
}

impl Default for TieBreak {
    fn default() -> Self {
        TieBreak::Random
    }
}

impl TieBreak {
    /// Lenient name lookup, as used when loading persisted configuration.
    /// Unknown names select `Random`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "first" => TieBreak::First,
            "last" => TieBreak::Last,
            _ => TieBreak::Random,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TieBreak::Random => "Random",
            TieBreak::First => "First",
            TieBreak::Last => "Last",
        }
    }
}

/// The per-path datum of a branching station.  Which variant an option
/// holds is fixed by the mode of the owning policy.
#[derive(Debug, Clone, PartialEq)]
pub enum DecideOption {
    Rate(String),
    Condition(String),
    ClientTypes(Vec<String>),
    Multiplicity(u32),
    Value(String),
    Unconfigured,
}

/// The `BranchPolicy` is the configuration of a branching station: the
/// decision mode, one option per outgoing path (index aligned with the
/// outgoing edges), and the mode specific settings `key`, `multi_value` and
/// `tie_break`.  Setters keep the mode and the options consistent - setting
/// conditions switches to `Condition`, setting rates switches to `Chance`,
/// and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BranchPolicyRepr", into = "BranchPolicyRepr")]
pub struct BranchPolicy {
    mode: DecideMode,
    options: Vec<DecideOption>,
    key: String,
    multi_value: bool,
    tie_break: TieBreak,
}

impl Default for BranchPolicy {
    fn default() -> Self {
        Self {
            mode: DecideMode::default(),
            options: Vec::new(),
            key: String::new(),
            multi_value: true,
            tie_break: TieBreak::default(),
        }
    }
}

impl BranchPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy in `mode`, with default options for `path_count` paths.
    pub fn with_mode(mode: DecideMode, path_count: usize) -> Self {
        Self {
            mode,
            options: vec![mode.default_option(); path_count],
            ..Self::default()
        }
    }

    pub fn mode(&self) -> DecideMode {
        self.mode
    }

    pub fn options(&self) -> &[DecideOption] {
        &self.options
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn multi_value(&self) -> bool {
        self.multi_value
    }

    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    /// Switch the mode.  Options of another kind are replaced by the
    /// defaults of the new mode, and the number of options is kept.
    pub fn set_mode(&mut self, mode: DecideMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.options = self
            .options
            .iter()
            .map(|option| {
                if mode.accepts(option) {
                    option.clone()
                } else {
                    mode.default_option()
                }
            })
            .collect();
    }

    pub fn set_rates(&mut self, rates: Vec<String>) {
        self.mode = DecideMode::Chance;
        self.options = rates.into_iter().map(DecideOption::Rate).collect();
    }

    /// The last condition belongs to the default path and is never
    /// evaluated; it may be left empty.
    pub fn set_conditions(&mut self, conditions: Vec<String>) {
        self.mode = DecideMode::Condition;
        self.options = conditions.into_iter().map(DecideOption::Condition).collect();
    }

    pub fn set_client_types(&mut self, client_types: Vec<Vec<String>>) {
        self.mode = DecideMode::ClientType;
        self.options = client_types
            .into_iter()
            .map(DecideOption::ClientTypes)
            .collect();
    }

    /// Multiplicities must be at least 1; otherwise the policy is left
    /// unchanged.
    pub fn set_multiplicities(&mut self, multiplicities: Vec<u32>) -> Result<(), SimulationError> {
        if let Some(path) = multiplicities.iter().position(|multiplicity| *multiplicity == 0) {
            return Err(SimulationError::invariant(
                "multiplicity",
                format!["path {} has multiplicity 0, but at least 1 is required", path + 1],
            ));
        }
        self.mode = DecideMode::Sequence;
        self.options = multiplicities
            .into_iter()
            .map(DecideOption::Multiplicity)
            .collect();
        Ok(())
    }

    pub fn set_key_values(&mut self, key: &str, values: Vec<String>) {
        self.mode = DecideMode::KeyValue;
        self.key = key.to_string();
        self.options = values.into_iter().map(DecideOption::Value).collect();
    }

    pub fn set_key(&mut self, key: &str) {
        self.set_mode(DecideMode::KeyValue);
        self.key = key.to_string();
    }

    pub fn set_multi_value(&mut self, multi_value: bool) {
        self.multi_value = multi_value;
    }

    pub fn set_tie_break(&mut self, tie_break: TieBreak) {
        self.tie_break = tie_break;
    }

    /// Follow a change of the outgoing edges: options are padded with the
    /// defaults of the current mode, or truncated.
    pub fn set_path_count(&mut self, path_count: usize) {
        let default_option = self.mode.default_option();
        self.options.resize(path_count, default_option);
    }

    /// Rename a client type in all `ClientType` options.  Returns whether
    /// anything was renamed.
    pub fn rename_client_type(&mut self, old_name: &str, new_name: &str) -> bool {
        if self.mode != DecideMode::ClientType {
            return false;
        }
        let mut renamed = false;
        self.options
            .iter_mut()
            .filter_map(|option| match option {
                DecideOption::ClientTypes(types) => Some(types),
                _ => None,
            })
            .flat_map(|types| types.iter_mut())
            .filter(|client_type| client_type.as_str() == old_name)
            .for_each(|client_type| {
                *client_type = new_name.to_string();
                renamed = true;
            });
        renamed
    }

    /// The rate expression of a path.  Paths without an option weigh 1.
    pub fn rate(&self, path: usize) -> &str {
        match self.options.get(path) {
            Some(DecideOption::Rate(rate)) => rate,
            _ => "1",
        }
    }

    /// The condition of a path, or `None` when the path has no option - a
    /// missing condition always matches.
    pub fn condition(&self, path: usize) -> Option<&str> {
        match self.options.get(path) {
            Some(DecideOption::Condition(condition)) => Some(condition),
            _ => None,
        }
    }

    pub fn client_types(&self, path: usize) -> &[String] {
        match self.options.get(path) {
            Some(DecideOption::ClientTypes(types)) => types,
            _ => &[],
        }
    }

    pub fn multiplicity(&self, path: usize) -> u32 {
        match self.options.get(path) {
            Some(DecideOption::Multiplicity(multiplicity)) => (*multiplicity).max(1),
            _ => 1,
        }
    }

    pub fn value(&self, path: usize) -> &str {
        match self.options.get(path) {
            Some(DecideOption::Value(value)) => value,
            _ => "",
        }
    }

    /// Whether a property value selects a path in `KeyValue` mode.  An empty
    /// match value never matches.  With `multi_value`, the match value is a
    /// `;`-separated set.
    pub fn value_matches(&self, path: usize, property_value: &str) -> bool {
        let value = self.value(path);
        if value.is_empty() {
            return false;
        }
        if self.multi_value {
            split_values(value)
                .iter()
                .any(|candidate| candidate == property_value)
        } else {
            value == property_value
        }
    }

    /// Check the options against the number of outgoing paths.  Fewer
    /// options than paths are allowed (missing options take the mode
    /// defaults), more options than paths are not.
    pub fn check_path_count(&self, path_count: usize) -> Result<(), SimulationError> {
        if path_count == 0 {
            return Err(SimulationError::configuration(
                "options",
                "a branching station needs at least one outgoing path",
            ));
        }
        if self.options.len() > path_count {
            return Err(SimulationError::configuration(
                "options",
                format![
                    "{} options are configured, but there are only {} outgoing paths",
                    self.options.len(),
                    path_count
                ],
            ));
        }
        if self.mode == DecideMode::KeyValue && self.key.trim().is_empty() {
            return Err(SimulationError::configuration(
                "key",
                "deciding by property value requires a property key",
            ));
        }
        Ok(())
    }

    /// Describe each path, for edge labels, logs and reports.
    pub fn path_labels(&self) -> Vec<String> {
        let path_count = self.options.len();
        let is_default = |path: usize| path + 1 == path_count;
        let rate_sum = (0..path_count)
            .map(|path| self.rate(path).trim().parse::<f64>().map(|rate| rate.max(0.0)))
            .collect::<Result<Vec<f64>, _>>()
            .map(|rates| rates.iter().sum::<f64>())
            .ok()
            .filter(|sum| *sum > 0.0);
        (0..path_count)
            .map(|path| match self.mode {
                DecideMode::Chance => {
                    let rate = self.rate(path);
                    match (rate_sum, rate.trim().parse::<f64>()) {
                        (Some(sum), Ok(value)) => {
                            format!["Rate {} ({:.1}%)", rate, 100.0 * value.max(0.0) / sum]
                        }
                        _ => format!["Rate {}", rate],
                    }
                }
                DecideMode::Condition if is_default(path) => String::from("else"),
                DecideMode::Condition => format!["Condition {}", path + 1],
                DecideMode::ClientType if is_default(path) => {
                    String::from("all other client types")
                }
                DecideMode::ClientType => {
                    let types = self.client_types(path);
                    let mut label = types
                        .iter()
                        .take(3)
                        .cloned()
                        .collect::<Vec<String>>()
                        .join(",");
                    if types.len() > 3 {
                        label.push_str(",...");
                    }
                    label
                }
                DecideMode::Sequence => match self.multiplicity(path) {
                    1 => format!["Path {}", path + 1],
                    multiplicity => format!["Path {} ({}x)", path + 1, multiplicity],
                },
                DecideMode::KeyValue if is_default(path) => String::from("all other values"),
                DecideMode::KeyValue => format!["{}={}", self.key, self.value(path)],
                DecideMode::ShortestQueueNext
                | DecideMode::ShortestQueueProcess
                | DecideMode::MinClientsNext
                | DecideMode::MinClientsProcess
                | DecideMode::LongestQueueNext
                | DecideMode::LongestQueueProcess
                | DecideMode::MaxClientsNext
                | DecideMode::MaxClientsProcess => String::new(),
            })
            .collect()
    }
}

/// The persisted form of a `BranchPolicy`.  Each option stores only the
/// field that belongs to the mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct BranchPolicyRepr {
    mode: DecideMode,
    #[serde(skip_serializing_if = "String::is_empty")]
    key: String,
    multi_value: bool,
    tie_break: String,
    options: Vec<OptionRepr>,
}

impl Default for BranchPolicyRepr {
    fn default() -> Self {
        Self {
            mode: DecideMode::default(),
            key: String::new(),
            multi_value: true,
            tie_break: String::from(TieBreak::default().name()),
            options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct OptionRepr {
    #[serde(skip_serializing_if = "Option::is_none")]
    rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    multiplicity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

impl TryFrom<BranchPolicyRepr> for BranchPolicy {
    type Error = SimulationError;

    fn try_from(repr: BranchPolicyRepr) -> Result<Self, Self::Error> {
        let mode = repr.mode;
        let options = repr
            .options
            .into_iter()
            .enumerate()
            .map(|(path, option)| match mode {
                DecideMode::Chance => Ok(DecideOption::Rate(
                    option
                        .rate
                        .filter(|rate| !rate.trim().is_empty())
                        .unwrap_or_else(|| String::from("1")),
                )),
                DecideMode::Condition => {
                    Ok(DecideOption::Condition(option.condition.unwrap_or_default()))
                }
                DecideMode::ClientType => Ok(DecideOption::ClientTypes(split_values(
                    &option.client_type.unwrap_or_default(),
                ))),
                DecideMode::Sequence => match option.multiplicity {
                    None => Ok(DecideOption::Multiplicity(1)),
                    Some(multiplicity) if multiplicity >= 1 && multiplicity <= u32::MAX as i64 => {
                        Ok(DecideOption::Multiplicity(multiplicity as u32))
                    }
                    Some(multiplicity) => Err(SimulationError::invariant(
                        "multiplicity",
                        format![
                            "path {} has multiplicity {}, but a positive number is required",
                            path + 1,
                            multiplicity
                        ],
                    )),
                },
                DecideMode::KeyValue => Ok(DecideOption::Value(option.value.unwrap_or_default())),
                _ => Ok(DecideOption::Unconfigured),
            })
            .collect::<Result<Vec<DecideOption>, SimulationError>>()?;
        Ok(Self {
            mode,
            options,
            key: repr.key,
            multi_value: repr.multi_value,
            tie_break: TieBreak::from_name(&repr.tie_break),
        })
    }
}

impl From<BranchPolicy> for BranchPolicyRepr {
    fn from(policy: BranchPolicy) -> Self {
        Self {
            mode: policy.mode,
            key: policy.key,
            multi_value: policy.multi_value,
            tie_break: String::from(policy.tie_break.name()),
            options: policy
                .options
                .into_iter()
                .map(|option| match option {
                    DecideOption::Rate(rate) => OptionRepr {
                        rate: Some(rate),
                        ..OptionRepr::default()
                    },
                    DecideOption::Condition(condition) => OptionRepr {
                        condition: Some(condition),
                        ..OptionRepr::default()
                    },
                    DecideOption::ClientTypes(types) => OptionRepr {
                        client_type: Some(join_values(&types)),
                        ..OptionRepr::default()
                    },
                    DecideOption::Multiplicity(multiplicity) => OptionRepr {
                        multiplicity: Some(multiplicity as i64),
                        ..OptionRepr::default()
                    },
                    DecideOption::Value(value) => OptionRepr {
                        value: Some(value),
                        ..OptionRepr::default()
                    },
                    DecideOption::Unconfigured => OptionRepr::default(),
                })
                .collect(),
        }
    }
}
