//! # Overview
//! "Sim Junction" provides the decision cores of the branching and
//! synchronization stations in a discrete event queueing simulation.  A
//! simulation engine owns the clock, the event list and the entities, and
//! calls into this crate synchronously whenever an entity reaches a decision
//! point or a rendezvous point.
//!
//! This repository contains:
//!
//! * Branch routing, for selecting the outgoing path of an arriving entity by
//! chance, condition, client type, sequence, downstream load or property
//! value.
//! * Rendezvous matching, for releasing one waiting entity per input queue -
//! optionally requiring a shared property value - as individual entities, a
//! temporary group or a permanently merged entity.
//! * Station models, which wrap the policies with per-run state, trace
//! records and station identification of errors.
//! * Input modeling, for the seeded random number generation behind chance
//! routing and random tie-breaks.
//!
//! The crate holds no global state.  Parallel replications each own their
//! stations and `Services`.
pub mod expression;
pub mod input_modeling;
pub mod models;
pub mod network;
pub mod rendezvous;
pub mod routing;
pub mod simulator;
pub mod utils;

pub use utils::errors::SimulationError;
