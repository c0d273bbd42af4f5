use super::ModelRecord;

/// The additional status and record-keeping methods of `Reportable` provide
/// improved simulation reasoning, reporting, and debugging, but do not
/// impact routing or release decisions.
pub trait Reportable {
    fn status(&self) -> String;
    fn records(&self) -> &Vec<ModelRecord>;
}
