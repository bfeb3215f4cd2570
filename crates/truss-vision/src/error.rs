use truss_vision_grasp::{GraspError, SelectionPolicy};
use truss_vision_segment::{SegmentClass, SegmentError};

/// Per-image failures of the truss pipeline.
///
/// Every variant aborts the current image only; the caller is free to go on
/// with the next one.
#[derive(thiserror::Error, Debug)]
pub enum TrussError {
    #[error("{class} mask is empty")]
    EmptyMask { class: SegmentClass },

    #[error("truss mask is empty, nothing to crop")]
    EmptyTruss,

    #[error("no fruit circle survived filtering")]
    NoViableCircles,

    #[error("no grasp candidate left on the stem ({removed} px suppressed)")]
    NoGraspCandidate { removed: usize },

    #[error("selection policy {policy} has no target")]
    MissingTarget { policy: SelectionPolicy },

    #[error(transparent)]
    Segment(#[from] SegmentError),
}

impl From<GraspError> for TrussError {
    fn from(err: GraspError) -> Self {
        match err {
            GraspError::NoCandidate { removed } => TrussError::NoGraspCandidate { removed },
            GraspError::MissingTarget { policy } => TrussError::MissingTarget { policy },
        }
    }
}
