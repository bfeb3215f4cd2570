use crate::policy::SelectionPolicy;

/// Errors returned by the grasp selector.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GraspError {
    #[error("no grasp candidate left after suppression ({removed} px removed)")]
    NoCandidate { removed: usize },
    #[error("selection policy {policy} has no target")]
    MissingTarget { policy: SelectionPolicy },
}
