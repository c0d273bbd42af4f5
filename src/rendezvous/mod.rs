//! The rendezvous module holds the decision core of synchronization
//! stations.  Entities wait in one queue per input, and `try_release` tests
//! whether one entity from every input can leave together.  The matcher
//! holds no state of its own between calls.

pub mod matcher;
pub mod policy;
pub mod queues;

pub use self::matcher::{try_release, Release};
pub use self::policy::{
    Grouping, GroupingMode, MatchProperty, PropertyMode, RendezvousPolicy, TransferMode,
};
pub use self::queues::InputQueues;
