/// Errors returned by the segmenter. All of them are input contract violations.
#[derive(thiserror::Error, Debug)]
pub enum SegmentError {
    #[error("{plane} plane has {actual} values, expected {expected}")]
    PlaneSizeMismatch {
        plane: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("{plane} plane is required by the selected strategy")]
    MissingPlane { plane: &'static str },
    #[error("expected 3 seed centers, got {count}")]
    InvalidSeedCount { count: usize },
}
