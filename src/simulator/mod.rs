//! The simulator module holds the per-run context that the simulation
//! engine hands to the stations.  The engine itself - clock, event list and
//! entity ownership - lives outside this crate and calls into the station
//! models synchronously from a single event-processing step.

pub mod services;

pub use self::services::Services;
