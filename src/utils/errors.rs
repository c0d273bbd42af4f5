use thiserror::Error;

/// `SimulationError` enumerates all possible errors returned by the station
/// routing and rendezvous cores
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Represents an invalid station configuration, detected when the
    /// configuration is used
    #[error("Invalid configuration of `{field}`: {reason}")]
    Configuration { field: String, reason: String },

    /// Represents a configuration value rejected at the time it was set or
    /// loaded
    #[error("Invariant violated for `{field}`: {reason}")]
    InvariantViolation { field: String, reason: String },

    /// Represents an expression the evaluator could not evaluate
    #[error("Failed to evaluate expression \"{expression}\": {reason}")]
    Expression { expression: String, reason: String },

    /// Represents an error raised while a specific station was processing
    #[error("Station {station_id}: {source}")]
    AtStation {
        station_id: String,
        #[source]
        source: Box<SimulationError>,
    },

    /// Represents an operation requested on an input slot that does not exist
    #[error("Input {input} does not exist at a station with {input_count} inputs")]
    InputNotFound { input: usize, input_count: usize },

    /// Represents an operation requested on a station that does not exist
    #[error("A specified station cannot be found")]
    StationNotFound,

    /// Transparent serde_json errors
    #[error(transparent)]
    JSONError(#[from] serde_json::error::Error),

    /// Transparent serde_yaml errors
    #[error(transparent)]
    YAMLError(#[from] serde_yaml::Error),

    /// Transparent Weighted Index distribution errors
    #[error(transparent)]
    WeightedError(#[from] rand_distr::WeightedError),
}

impl SimulationError {
    pub fn configuration(field: &str, reason: impl Into<String>) -> Self {
        SimulationError::Configuration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invariant(field: &str, reason: impl Into<String>) -> Self {
        SimulationError::InvariantViolation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn expression(expression: &str, reason: impl Into<String>) -> Self {
        SimulationError::Expression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    /// Attach the identifier of the station that raised the error.  An error
    /// that already names a station is returned unchanged.
    pub fn at_station(self, station_id: &str) -> Self {
        match self {
            SimulationError::AtStation { .. } => self,
            other => SimulationError::AtStation {
                station_id: station_id.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The identifier of the station that raised the error, if known.
    pub fn station_id(&self) -> Option<&str> {
        match self {
            SimulationError::AtStation { station_id, .. } => Some(station_id),
            _ => None,
        }
    }
}
