//! Three-cluster k-means over the hue feature space.
//!
//! Features are fixed 4-vectors `[r·cos h, r·sin h, chroma, saturation]`;
//! absent channels stay 0 for samples and centers alike, so they never
//! contribute to a distance.

use nalgebra::Vector4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::hue::{hue_from_xy, hue_to_xy};
use crate::params::ClusterCenter;

pub(crate) type Feature = Vector4<f32>;

/// Which channels take part and how the hue circle is scaled.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FeatureSpace {
    pub hue_radius: f32,
    pub chroma: bool,
    pub saturation: bool,
}

impl FeatureSpace {
    #[inline]
    pub fn embed(&self, hue_deg: f32, chroma: f32, saturation: f32) -> Feature {
        let (x, y) = hue_to_xy(hue_deg, self.hue_radius);
        Vector4::new(
            x,
            y,
            if self.chroma { chroma } else { 0.0 },
            if self.saturation { saturation } else { 0.0 },
        )
    }

    pub fn from_center(&self, c: &ClusterCenter) -> Feature {
        self.embed(
            c.hue_deg,
            c.chroma.unwrap_or(0.0),
            c.saturation.unwrap_or(0.0),
        )
    }

    pub fn to_center(&self, f: &Feature) -> ClusterCenter {
        ClusterCenter {
            hue_deg: hue_from_xy(f.x, f.y),
            chroma: self.chroma.then_some(f.z),
            saturation: self.saturation.then_some(f.w),
        }
    }
}

/// Index of the nearest center; ties go to the lowest index.
#[inline]
pub(crate) fn nearest(centers: &[Feature; 3], f: &Feature) -> usize {
    let mut best = 0;
    let mut best_d = (f - centers[0]).norm_squared();
    for (i, c) in centers.iter().enumerate().skip(1) {
        let d = (f - c).norm_squared();
        if d < best_d {
            best = i;
            best_d = d;
        }
    }
    best
}

/// Assign every sample to its nearest center and return the cluster means.
/// Clusters that receive no sample keep their previous center.
fn update(samples: &[Feature], centers: &[Feature; 3]) -> [Feature; 3] {
    let mut sums = [Feature::zeros(); 3];
    let mut counts = [0usize; 3];
    for f in samples {
        let k = nearest(centers, f);
        sums[k] += f;
        counts[k] += 1;
    }
    std::array::from_fn(|k| {
        if counts[k] > 0 {
            sums[k] / counts[k] as f32
        } else {
            centers[k]
        }
    })
}

fn compactness(samples: &[Feature], centers: &[Feature; 3]) -> f32 {
    samples
        .iter()
        .map(|f| (f - centers[nearest(centers, f)]).norm_squared())
        .sum()
}

fn max_shift(a: &[Feature; 3], b: &[Feature; 3]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p - q).norm())
        .fold(0.0, f32::max)
}

/// Seeded clustering: one assignment to the fixed seeds, one mean update.
pub(crate) fn refine_seeded(samples: &[Feature], seeds: [Feature; 3]) -> [Feature; 3] {
    update(samples, &seeds)
}

/// Lloyd iterations from `init` until the largest center shift drops below
/// `epsilon` or `max_iters` is reached.
fn lloyd(samples: &[Feature], init: [Feature; 3], max_iters: usize, epsilon: f32) -> [Feature; 3] {
    let mut centers = init;
    for _ in 0..max_iters.max(1) {
        let next = update(samples, &centers);
        let shift = max_shift(&centers, &next);
        centers = next;
        if shift < epsilon {
            break;
        }
    }
    centers
}

/// k-means++ seeding: first center uniform, then proportional to squared
/// distance from the closest chosen center.
fn plus_plus_init(samples: &[Feature], rng: &mut StdRng) -> [Feature; 3] {
    let mut centers = [samples[rng.gen_range(0..samples.len())]; 3];
    let mut d2: Vec<f32> = samples
        .iter()
        .map(|f| (f - centers[0]).norm_squared())
        .collect();

    for k in 1..3 {
        let total: f32 = d2.iter().sum();
        let idx = if total > 0.0 {
            let mut target = rng.gen::<f32>() * total;
            let mut chosen = samples.len() - 1;
            for (i, &d) in d2.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            rng.gen_range(0..samples.len())
        };
        centers[k] = samples[idx];
        for (d, f) in d2.iter_mut().zip(samples) {
            *d = d.min((f - centers[k]).norm_squared());
        }
    }
    centers
}

/// Unsupervised clustering with `attempts` random restarts; the run with the
/// smallest within-cluster sum of squares wins.
pub(crate) fn cluster_unsupervised(
    samples: &[Feature],
    attempts: usize,
    max_iters: usize,
    epsilon: f32,
    seed: u64,
) -> [Feature; 3] {
    if samples.is_empty() {
        return [Feature::zeros(); 3];
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut best: Option<([Feature; 3], f32)> = None;
    for _ in 0..attempts.max(1) {
        let init = plus_plus_init(samples, &mut rng);
        let centers = lloyd(samples, init, max_iters, epsilon);
        let score = compactness(samples, &centers);
        if best.as_ref().is_none_or(|(_, s)| score < *s) {
            best = Some((centers, score));
        }
    }
    best.map(|(c, _)| c).unwrap_or([Feature::zeros(); 3])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const HUE_ONLY: FeatureSpace = FeatureSpace {
        hue_radius: 1.0,
        chroma: false,
        saturation: false,
    };

    fn hues(values: &[(f32, usize)]) -> Vec<Feature> {
        values
            .iter()
            .flat_map(|&(h, n)| std::iter::repeat(HUE_ONLY.embed(h, 0.0, 0.0)).take(n))
            .collect()
    }

    #[test]
    fn nearest_breaks_ties_by_lowest_index() {
        let c = HUE_ONLY.embed(0.0, 0.0, 0.0);
        let centers = [c, c, HUE_ONLY.embed(180.0, 0.0, 0.0)];
        assert_eq!(nearest(&centers, &c), 0);
    }

    #[test]
    fn seeded_refinement_moves_centers_to_cluster_means() {
        let samples = hues(&[(10.0, 50), (100.0, 30), (230.0, 20)]);
        let seeds = [0.0, 90.0, 240.0].map(|h| HUE_ONLY.embed(h, 0.0, 0.0));
        let out = refine_seeded(&samples, seeds);
        let got: Vec<f32> = out.iter().map(|f| HUE_ONLY.to_center(f).hue_deg).collect();
        assert_abs_diff_eq!(got[0], 10.0, epsilon = 1e-3);
        assert_abs_diff_eq!(got[1], 100.0, epsilon = 1e-3);
        assert_abs_diff_eq!(got[2], 230.0, epsilon = 1e-3);
    }

    #[test]
    fn empty_cluster_keeps_its_seed() {
        let samples = hues(&[(0.0, 10)]);
        let seeds = [0.0, 90.0, 240.0].map(|h| HUE_ONLY.embed(h, 0.0, 0.0));
        let out = refine_seeded(&samples, seeds);
        assert_eq!(out[1], seeds[1]);
        assert_eq!(out[2], seeds[2]);
    }

    #[test]
    fn unsupervised_finds_three_separated_hues() {
        let samples = hues(&[(5.0, 40), (120.0, 40), (240.0, 40)]);
        let centers = cluster_unsupervised(&samples, 3, 20, 1e-4, 7);
        let mut got: Vec<f32> = centers
            .iter()
            .map(|f| HUE_ONLY.to_center(f).hue_deg)
            .collect();
        got.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_abs_diff_eq!(got[0], 5.0, epsilon = 1e-2);
        assert_abs_diff_eq!(got[1], 120.0, epsilon = 1e-2);
        assert_abs_diff_eq!(got[2], 240.0, epsilon = 1e-2);
    }

    #[test]
    fn unsupervised_is_deterministic_for_a_seed() {
        let samples = hues(&[(5.0, 13), (60.0, 7), (200.0, 21), (300.0, 4)]);
        let a = cluster_unsupervised(&samples, 2, 10, 1e-3, 42);
        let b = cluster_unsupervised(&samples, 2, 10, 1e-3, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn missing_channels_do_not_affect_distance() {
        let space = FeatureSpace {
            hue_radius: 2.0,
            chroma: true,
            saturation: false,
        };
        let f = space.embed(90.0, 0.25, 0.9);
        assert_abs_diff_eq!(f.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(f.y, 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(f.z, 0.25);
        assert_abs_diff_eq!(f.w, 0.0);
        let c = space.to_center(&f);
        assert_eq!(c.saturation, None);
        assert_eq!(c.chroma, Some(0.25));
    }
}
