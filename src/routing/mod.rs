//! The routing module holds the decision core of branching stations.  A
//! `BranchPolicy` is the persisted configuration, and a `BranchRouter`
//! applies it to each arriving entity, with the help of the topology view
//! and the expression evaluator of the engine.

pub mod policy;
pub mod router;

pub use self::policy::{BranchPolicy, DecideMode, DecideOption, TieBreak};
pub use self::router::BranchRouter;
