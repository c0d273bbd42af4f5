//! The input modeling module provides the stochastic foundation of the
//! routing decisions.  The module includes the index random variable behind
//! chance routing and random tie-breaks, and a structure around random
//! number generation.

pub mod random_variable;
pub mod uniform_rng;

pub use random_variable::Index as IndexRandomVariable;
pub use uniform_rng::UniformRNG;
