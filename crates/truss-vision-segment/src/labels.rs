use serde::{Deserialize, Serialize};

use crate::hue::angular_distance_deg;

/// Semantic class of a pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentClass {
    Fruit,
    Stem,
    Background,
}

impl SegmentClass {
    pub const ALL: [SegmentClass; 3] = [
        SegmentClass::Fruit,
        SegmentClass::Stem,
        SegmentClass::Background,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SegmentClass::Fruit => "fruit",
            SegmentClass::Stem => "stem",
            SegmentClass::Background => "background",
        }
    }
}

impl std::fmt::Display for SegmentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Cluster index assigned to each class. The three indices are a permutation
/// of `0..3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLabels {
    pub fruit: usize,
    pub stem: usize,
    pub background: usize,
}

impl ClassLabels {
    pub fn cluster(&self, class: SegmentClass) -> usize {
        match class {
            SegmentClass::Fruit => self.fruit,
            SegmentClass::Stem => self.stem,
            SegmentClass::Background => self.background,
        }
    }

    /// Class owning cluster `k`.
    pub fn class_of(&self, k: usize) -> Option<SegmentClass> {
        SegmentClass::ALL
            .into_iter()
            .find(|&class| self.cluster(class) == k)
    }
}

fn nearest_to(center_hues: &[f32; 3], prior: f32, exclude: Option<usize>) -> usize {
    let mut best: Option<(usize, f32)> = None;
    for (i, &h) in center_hues.iter().enumerate() {
        if Some(i) == exclude {
            continue;
        }
        let d = angular_distance_deg(h, prior);
        if best.is_none_or(|(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map_or(0, |(i, _)| i)
}

/// Map three cluster hues onto the classes using the prior reference hues
/// `[fruit, stem, background]`.
///
/// Fruit takes the cluster nearest the fruit prior; background the nearest of
/// the remaining two to the background prior; stem is what is left. Ties go to
/// the lower cluster index. The result is always a permutation.
pub fn resolve_labels(center_hues: &[f32; 3], prior_hues: &[f32; 3]) -> ClassLabels {
    let fruit = nearest_to(center_hues, prior_hues[0], None);
    let background = nearest_to(center_hues, prior_hues[2], Some(fruit));
    let stem = 3 - fruit - background;
    ClassLabels {
        fruit,
        stem,
        background,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIORS: [f32; 3] = [0.0, 90.0, 240.0];

    fn is_permutation(l: &ClassLabels) -> bool {
        let mut seen = [false; 3];
        for k in [l.fruit, l.stem, l.background] {
            if k >= 3 || seen[k] {
                return false;
            }
            seen[k] = true;
        }
        true
    }

    #[test]
    fn labels_follow_priors_regardless_of_cluster_order() {
        let l = resolve_labels(&[250.0, 5.0, 80.0], &PRIORS);
        assert_eq!(
            l,
            ClassLabels {
                fruit: 1,
                stem: 2,
                background: 0
            }
        );
        assert_eq!(l.class_of(2), Some(SegmentClass::Stem));
    }

    #[test]
    fn resolution_is_total_for_any_three_centers() {
        let mut h = 0.0f32;
        while h < 360.0 {
            for (a, b) in [(0.0, 0.0), (h, h), (15.0, 350.0), (240.0, 245.0), (120.0, 300.0)] {
                let labels = resolve_labels(&[h, a, b], &PRIORS);
                assert!(is_permutation(&labels), "{h} {a} {b}: {labels:?}");
            }
            h += 7.0;
        }
    }

    #[test]
    fn identical_centers_resolve_by_index() {
        let l = resolve_labels(&[0.0, 0.0, 0.0], &PRIORS);
        assert_eq!(l.fruit, 0);
        assert_eq!(l.background, 1);
        assert_eq!(l.stem, 2);
    }
}
