//! The models module provides the stations built on the routing and
//! rendezvous cores.  Stations add what the cores leave to the run: the
//! per-run state, trace records, and identification of the station in
//! errors.  A `Station` is persisted with its configuration only.

use serde::{Deserialize, Serialize};

use crate::utils::errors::SimulationError;

pub mod decide_station;
pub mod match_station;
pub mod model_trait;

pub use self::decide_station::DecideStation;
pub use self::match_station::MatchStation;
pub use self::model_trait::Reportable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub time: f64,
    pub action: String,
    pub subject: String,
}

/// The persisted envelope of a station, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Station {
    Decide(DecideStation),
    Match(MatchStation),
}

impl Station {
    pub fn id(&self) -> &str {
        match self {
            Station::Decide(station) => station.id(),
            Station::Match(station) => station.id(),
        }
    }

    /// Read a list of stations from YAML (or JSON, which YAML accepts).
    pub fn from_yaml_list(yaml: &str) -> Result<Vec<Station>, SimulationError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_list(json: &str) -> Result<Vec<Station>, SimulationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_yaml_list(stations: &[Station]) -> Result<String, SimulationError> {
        Ok(serde_yaml::to_string(stations)?)
    }

    /// Find a station by id, among stations read from configuration.
    pub fn find<'a>(stations: &'a mut [Station], id: &str) -> Result<&'a mut Station, SimulationError> {
        stations
            .iter_mut()
            .find(|station| station.id() == id)
            .ok_or(SimulationError::StationNotFound)
    }
}

impl Reportable for Station {
    fn status(&self) -> String {
        match self {
            Station::Decide(station) => station.status(),
            Station::Match(station) => station.status(),
        }
    }

    fn records(&self) -> &Vec<ModelRecord> {
        match self {
            Station::Decide(station) => station.records(),
            Station::Match(station) => station.records(),
        }
    }
}
