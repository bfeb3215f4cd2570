use std::fmt;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::candidates::GraspCandidate;

/// How the final grasp candidate is chosen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Closest to the fruit centroid.
    #[default]
    CenterOfMass,
    /// Closest to the midpoint of the first two stem endpoints.
    StemMidpoint,
    /// Closest to the endpoint farthest along the local x axis, with the
    /// distance divided by the supporting segment length.
    StemEnd,
    /// Closest to the center of the original image.
    ImageCenter,
}

impl SelectionPolicy {
    pub fn name(self) -> &'static str {
        match self {
            SelectionPolicy::CenterOfMass => "center_of_mass",
            SelectionPolicy::StemMidpoint => "stem_midpoint",
            SelectionPolicy::StemEnd => "stem_end",
            SelectionPolicy::ImageCenter => "image_center",
        }
    }

    /// Score of one candidate against `target`; lower is better.
    pub(crate) fn score(self, candidate: &GraspCandidate, target: Point2<f32>) -> f32 {
        let distance = (candidate.pixel - target).norm();
        match self {
            SelectionPolicy::StemEnd => distance / candidate.segment_len.max(1) as f32,
            _ => distance,
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Index of the best-scoring candidate; ties keep the first one.
pub(crate) fn select_best(
    candidates: &[GraspCandidate],
    policy: SelectionPolicy,
    target: Point2<f32>,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, c) in candidates.iter().enumerate() {
        let s = policy.score(c, target);
        if best.is_none_or(|(_, b)| s < b) {
            best = Some((i, s));
        }
    }
    best.map(|(i, _)| i)
}
