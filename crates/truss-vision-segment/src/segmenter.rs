use log::{debug, info};
use serde::{Deserialize, Serialize};
use truss_vision_core::BinaryMask;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::hue::{angular_distance_deg, HueScale};
use crate::kmeans::{cluster_unsupervised, nearest, refine_seeded, Feature, FeatureSpace};
use crate::labels::{resolve_labels, ClassLabels, SegmentClass};
use crate::params::{
    ClusterCenter, ClusterSeeding, ClusteringParams, SegmentationStrategy, SegmenterParams,
    ThresholdParams,
};
use crate::planes::{normalize_plane, ColorPlanes};
use crate::SegmentError;

/// Per-class masks of one image.
///
/// The three masks are pairwise disjoint. When `stem_visible` is false the
/// stem mask is empty and `background` is exactly the complement of `fruit`.
#[derive(Clone, Debug)]
pub struct Segmentation {
    pub fruit: BinaryMask,
    pub stem: BinaryMask,
    pub background: BinaryMask,
    /// Final cluster centers in cluster order (clustering strategy only).
    pub centers: Option<[ClusterCenter; 3]>,
    /// Cluster-to-class assignment (clustering strategy only).
    pub labels: Option<ClassLabels>,
    /// `false` when stem and background could not be told apart.
    pub stem_visible: bool,
}

impl Segmentation {
    pub fn mask(&self, class: SegmentClass) -> &BinaryMask {
        match class {
            SegmentClass::Fruit => &self.fruit,
            SegmentClass::Stem => &self.stem,
            SegmentClass::Background => &self.background,
        }
    }

    /// Center of the cluster assigned to `class`, if clustering was used.
    pub fn center(&self, class: SegmentClass) -> Option<ClusterCenter> {
        let centers = self.centers.as_ref()?;
        let labels = self.labels.as_ref()?;
        Some(centers[labels.cluster(class)])
    }

    /// Centers reordered as `[fruit, stem, background]`; feed these back via
    /// [`ClusterSeeding::Centers`] to repeat a classification.
    pub fn class_centers(&self) -> Option<Vec<ClusterCenter>> {
        SegmentClass::ALL
            .into_iter()
            .map(|class| self.center(class))
            .collect()
    }
}

/// Summary of a segmentation suitable for reports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentationSummary {
    pub fruit_pixels: usize,
    pub stem_pixels: usize,
    pub background_pixels: usize,
    pub stem_visible: bool,
    pub centers: Option<Vec<ClusterCenter>>,
}

impl From<&Segmentation> for SegmentationSummary {
    fn from(s: &Segmentation) -> Self {
        Self {
            fruit_pixels: s.fruit.count(),
            stem_pixels: s.stem.count(),
            background_pixels: s.background.count(),
            stem_visible: s.stem_visible,
            centers: s.class_centers(),
        }
    }
}

/// Classifies pixels into fruit, stem and background from colour planes.
#[derive(Clone, Debug, Default)]
pub struct HueColorSegmenter {
    params: SegmenterParams,
}

impl HueColorSegmenter {
    pub fn new(params: SegmenterParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SegmenterParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, planes),
            fields(width = planes.width(), height = planes.height())
        )
    )]
    pub fn segment(&self, planes: &ColorPlanes) -> Result<Segmentation, SegmentError> {
        let hue_deg: Vec<f32> = planes
            .hue()
            .iter()
            .map(|&h| self.params.hue_scale.to_degrees(h))
            .collect();

        let seg = match &self.params.strategy {
            SegmentationStrategy::Clustering(params) => {
                segment_clustering(planes, &hue_deg, params)?
            }
            SegmentationStrategy::Threshold(params) => segment_threshold(planes, &hue_deg, params)?,
        };

        debug!(
            "segmentation: fruit={} stem={} background={} px",
            seg.fruit.count(),
            seg.stem.count(),
            seg.background.count()
        );
        Ok(seg)
    }
}

fn seed_features(
    space: &FeatureSpace,
    params: &ClusteringParams,
) -> Result<Option<[Feature; 3]>, SegmentError> {
    match &params.seeding {
        ClusterSeeding::Priors => {
            let centers = params.priors.centers(space.chroma, space.saturation);
            Ok(Some(centers.map(|c| space.from_center(&c))))
        }
        ClusterSeeding::Centers(centers) => {
            let seeds: &[ClusterCenter; 3] = centers
                .as_slice()
                .try_into()
                .map_err(|_| SegmentError::InvalidSeedCount {
                    count: centers.len(),
                })?;
            Ok(Some((*seeds).map(|c| space.from_center(&c))))
        }
        ClusterSeeding::Unsupervised => Ok(None),
    }
}

fn segment_clustering(
    planes: &ColorPlanes,
    hue_deg: &[f32],
    params: &ClusteringParams,
) -> Result<Segmentation, SegmentError> {
    let (w, h) = (planes.width(), planes.height());

    // hue-only when the chroma plane is unavailable
    let chroma = planes.chroma().map(normalize_plane);
    let saturation = planes
        .saturation()
        .filter(|_| chroma.is_some())
        .map(normalize_plane);

    let space = FeatureSpace {
        hue_radius: params.hue_radius,
        chroma: chroma.is_some(),
        saturation: saturation.is_some(),
    };
    let feature_at = |i: usize| {
        space.embed(
            hue_deg[i],
            chroma.as_ref().map_or(0.0, |c| c[i]),
            saturation.as_ref().map_or(0.0, |s| s[i]),
        )
    };

    let step = params.subsample.max(1);
    let samples: Vec<Feature> = (0..h)
        .step_by(step)
        .flat_map(|y| (0..w).step_by(step).map(move |x| y * w + x))
        .map(feature_at)
        .collect();

    let centers_f = match seed_features(&space, params)? {
        Some(seeds) => refine_seeded(&samples, seeds),
        None => cluster_unsupervised(
            &samples,
            params.attempts,
            params.max_iters,
            params.epsilon,
            params.seed,
        ),
    };
    let centers = centers_f.map(|f| space.to_center(&f));
    let center_hues = centers.map(|c| c.hue_deg);
    let labels = resolve_labels(&center_hues, &params.priors.hue_deg);

    debug!(
        "clustering: {} samples, dims={}, centers (deg) = [{:.1}, {:.1}, {:.1}], fruit={} stem={} background={}",
        samples.len(),
        2 + space.chroma as usize + space.saturation as usize,
        center_hues[0],
        center_hues[1],
        center_hues[2],
        labels.fruit,
        labels.stem,
        labels.background
    );

    let assignment: Vec<usize> = (0..w * h)
        .map(|i| nearest(&centers_f, &feature_at(i)))
        .collect();
    let mask_of = |k: usize| BinaryMask {
        width: w,
        height: h,
        data: assignment.iter().map(|&a| a == k).collect(),
    };

    let fruit = mask_of(labels.fruit);
    let separation = angular_distance_deg(center_hues[labels.stem], center_hues[labels.background]);
    let (stem, background, stem_visible) = if separation < params.min_stem_separation_deg {
        info!(
            "stem and background hues {:.1}° apart, reporting no visible stem",
            separation
        );
        let background = fruit.complement();
        (BinaryMask::new(w, h), background, false)
    } else {
        (mask_of(labels.stem), mask_of(labels.background), true)
    };

    Ok(Segmentation {
        fruit,
        stem,
        background,
        centers: Some(centers),
        labels: Some(labels),
        stem_visible,
    })
}

fn segment_threshold(
    planes: &ColorPlanes,
    hue_deg: &[f32],
    params: &ThresholdParams,
) -> Result<Segmentation, SegmentError> {
    let saturation = planes
        .saturation()
        .ok_or(SegmentError::MissingPlane {
            plane: "saturation",
        })?;
    let (w, h) = (planes.width(), planes.height());

    let classes: Vec<SegmentClass> = hue_deg
        .iter()
        .zip(saturation)
        .map(|(&hue, &sat)| {
            if sat < params.min_saturation {
                SegmentClass::Background
            } else if params.fruit_band.contains(hue) {
                SegmentClass::Fruit
            } else if params.stem_band.contains(hue) {
                SegmentClass::Stem
            } else {
                SegmentClass::Background
            }
        })
        .collect();
    let mask_of = |class: SegmentClass| BinaryMask {
        width: w,
        height: h,
        data: classes.iter().map(|&c| c == class).collect(),
    };

    Ok(Segmentation {
        fruit: mask_of(SegmentClass::Fruit),
        stem: mask_of(SegmentClass::Stem),
        background: mask_of(SegmentClass::Background),
        centers: None,
        labels: None,
        stem_visible: true,
    })
}

/// Segment with the clustering strategy.
pub fn segment_truss(
    planes: &ColorPlanes,
    hue_scale: HueScale,
    params: &ClusteringParams,
) -> Result<Segmentation, SegmentError> {
    HueColorSegmenter::new(SegmenterParams {
        hue_scale,
        strategy: SegmentationStrategy::Clustering(params.clone()),
    })
    .segment(planes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_partition(seg: &Segmentation) {
        for i in 0..seg.fruit.data.len() {
            let n = [&seg.fruit, &seg.stem, &seg.background]
                .iter()
                .filter(|m| m.data[i])
                .count();
            assert!(n <= 1, "pixel {i} in {n} classes");
        }
        if !seg.stem_visible {
            assert!(seg.stem.is_empty());
            assert_eq!(seg.background, seg.fruit.complement());
        }
    }

    /// Left third red, middle third green, right third blue.
    fn three_band_planes(w: usize, h: usize) -> ColorPlanes {
        let hue = (0..w * h)
            .map(|i| match (i % w) * 3 / w {
                0 => 5.0,
                1 => 100.0,
                _ => 230.0,
            })
            .collect();
        ColorPlanes::new(w, h, hue).unwrap()
    }

    #[test]
    fn uniform_red_image_is_all_fruit() {
        let planes = ColorPlanes::new(12, 8, vec![0.0; 96]).unwrap();
        let seg = HueColorSegmenter::default().segment(&planes).unwrap();
        assert_eq!(seg.fruit.count(), 96);
        assert!(seg.stem.is_empty());
        assert!(seg.background.is_empty());
        assert!(seg.stem_visible);
        assert_partition(&seg);
    }

    #[test]
    fn three_hue_regions_map_to_three_classes() {
        let planes = three_band_planes(30, 6);
        let seg = HueColorSegmenter::default().segment(&planes).unwrap();
        assert_partition(&seg);
        assert_eq!(seg.fruit.count(), 60);
        assert_eq!(seg.stem.count(), 60);
        assert_eq!(seg.background.count(), 60);
        assert!(seg.fruit.get(0, 0));
        assert!(seg.stem.get(15, 3));
        assert!(seg.background.get(29, 5));

        let fruit = seg.center(SegmentClass::Fruit).unwrap();
        assert_abs_diff_eq!(fruit.hue_deg, 5.0, epsilon = 1e-2);
    }

    #[test]
    fn unsupervised_clustering_partitions_the_image() {
        let planes = three_band_planes(30, 6);
        let params = ClusteringParams {
            seeding: ClusterSeeding::Unsupervised,
            ..ClusteringParams::default()
        };
        let seg = segment_truss(&planes, HueScale::Degrees, &params).unwrap();
        assert_partition(&seg);
        assert_eq!(seg.fruit.count() + seg.stem.count() + seg.background.count(), 180);
        assert_eq!(seg.fruit.count(), 60);
    }

    #[test]
    fn close_stem_and_background_hues_hide_the_stem() {
        // red fruit plus two nearly identical blue regions
        let hue = (0..40)
            .map(|i| match i % 4 {
                0 | 1 => 0.0,
                2 => 236.0,
                _ => 242.0,
            })
            .collect();
        let planes = ColorPlanes::new(8, 5, hue).unwrap();
        let params = ClusteringParams {
            priors: crate::ClassPriors {
                hue_deg: [0.0, 235.0, 245.0],
                ..Default::default()
            },
            ..ClusteringParams::default()
        };
        let seg = segment_truss(&planes, HueScale::Degrees, &params).unwrap();
        assert!(!seg.stem_visible);
        assert!(seg.stem.is_empty());
        assert_eq!(seg.background, seg.fruit.complement());
        assert_eq!(seg.fruit.count(), 20);
        assert_partition(&seg);
    }

    #[test]
    fn previous_centers_reproduce_the_classification() {
        let planes = three_band_planes(30, 6);
        let first = HueColorSegmenter::default().segment(&planes).unwrap();
        let params = ClusteringParams {
            seeding: ClusterSeeding::Centers(first.class_centers().unwrap()),
            ..ClusteringParams::default()
        };
        let second = segment_truss(&planes, HueScale::Degrees, &params).unwrap();
        assert_eq!(first.fruit, second.fruit);
        assert_eq!(first.stem, second.stem);
        assert_eq!(first.background, second.background);

        let bad = ClusteringParams {
            seeding: ClusterSeeding::Centers(vec![ClusterCenter::hue(0.0)]),
            ..ClusteringParams::default()
        };
        assert!(matches!(
            segment_truss(&planes, HueScale::Degrees, &bad),
            Err(SegmentError::InvalidSeedCount { count: 1 })
        ));
    }

    #[test]
    fn chroma_separates_equal_hues() {
        // same hue everywhere, chroma splits fruit from background
        let w = 10;
        let hue = vec![10.0; w * 2];
        let chroma: Vec<f32> = (0..w * 2).map(|i| if i < w { 40.0 } else { -10.0 }).collect();
        let planes = ColorPlanes::new(w, 2, hue)
            .unwrap()
            .with_chroma(chroma)
            .unwrap();
        let params = ClusteringParams {
            priors: crate::ClassPriors {
                hue_deg: [0.0, 90.0, 20.0],
                chroma: [1.0, 0.0, -1.0],
                saturation: [0.0; 3],
            },
            min_stem_separation_deg: 0.0,
            ..ClusteringParams::default()
        };
        let seg = segment_truss(&planes, HueScale::Degrees, &params).unwrap();
        assert_partition(&seg);
        assert!(seg.fruit.get(3, 0));
        assert!(!seg.fruit.get(3, 1));
        assert_eq!(seg.fruit.count(), w);
    }

    #[test]
    fn saturation_separates_equal_hue_and_chroma() {
        // hue and chroma identical everywhere, only saturation differs by row
        let w = 10;
        let sat: Vec<f32> = (0..w * 2).map(|i| if i < w { 200.0 } else { 20.0 }).collect();
        let hue_chroma = || {
            ColorPlanes::new(w, 2, vec![10.0; w * 2])
                .unwrap()
                .with_chroma(vec![5.0; w * 2])
                .unwrap()
        };
        let params = ClusteringParams {
            priors: crate::ClassPriors {
                hue_deg: [0.0, 90.0, 20.0],
                chroma: [0.0; 3],
                saturation: [1.0, 0.0, -1.0],
            },
            min_stem_separation_deg: 0.0,
            ..ClusteringParams::default()
        };

        let planes = hue_chroma().with_saturation(sat).unwrap();
        let seg = segment_truss(&planes, HueScale::Degrees, &params).unwrap();
        assert_partition(&seg);
        assert_eq!(seg.fruit.count(), w);
        assert!(seg.fruit.get(4, 0));
        assert!(seg.background.get(4, 1));
        let fruit = seg.center(SegmentClass::Fruit).unwrap();
        assert_abs_diff_eq!(fruit.saturation.unwrap(), 1.0, epsilon = 1e-5);

        // without the saturation plane every pixel is identical
        let seg = segment_truss(&hue_chroma(), HueScale::Degrees, &params).unwrap();
        assert!(seg.fruit.count() == 0 || seg.fruit.count() == 2 * w);
    }

    #[test]
    fn subsampled_clustering_gives_full_resolution_masks() {
        let planes = three_band_planes(30, 6);
        let full = HueColorSegmenter::default().segment(&planes).unwrap();
        let params = ClusteringParams {
            subsample: 3,
            ..ClusteringParams::default()
        };
        let sub = segment_truss(&planes, HueScale::Degrees, &params).unwrap();
        assert_eq!(sub.fruit.width, 30);
        assert_eq!(full.fruit, sub.fruit);
        assert_eq!(full.stem, sub.stem);
        assert_eq!(full.background, sub.background);
        for class in SegmentClass::ALL {
            assert_abs_diff_eq!(
                full.center(class).unwrap().hue_deg,
                sub.center(class).unwrap().hue_deg,
                epsilon = 1e-3
            );
        }
    }

    #[test]
    fn hue_radius_trades_hue_against_chroma() {
        // row 0: hue 0, low chroma; row 1: hue 30, high chroma
        let w = 10;
        let hue: Vec<f32> = (0..w * 2).map(|i| if i < w { 0.0 } else { 30.0 }).collect();
        let chroma: Vec<f32> = (0..w * 2).map(|i| if i < w { -10.0 } else { 40.0 }).collect();
        let planes = ColorPlanes::new(w, 2, hue)
            .unwrap()
            .with_chroma(chroma)
            .unwrap();
        let params = |hue_radius: f32| ClusteringParams {
            priors: crate::ClassPriors {
                hue_deg: [0.0, 180.0, 30.0],
                chroma: [1.0, 0.0, -1.0],
                saturation: [0.0; 3],
            },
            hue_radius,
            ..ClusteringParams::default()
        };

        // unit circle: chroma decides, the first seed collects the hue 30 row
        let seg = segment_truss(&planes, HueScale::Degrees, &params(1.0)).unwrap();
        let centers = seg.centers.unwrap();
        assert_abs_diff_eq!(centers[0].hue_deg, 30.0, epsilon = 1e-3);
        assert_abs_diff_eq!(centers[2].hue_deg, 0.0, epsilon = 1e-3);

        // wide circle: hue decides, the first seed collects the hue 0 row
        let seg = segment_truss(&planes, HueScale::Degrees, &params(10.0)).unwrap();
        let centers = seg.centers.unwrap();
        assert_abs_diff_eq!(centers[0].hue_deg, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(centers[0].chroma.unwrap(), -1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(centers[2].hue_deg, 30.0, epsilon = 1e-3);
        assert_eq!(seg.labels.unwrap().fruit, 0);
        assert!(seg.fruit.get(0, 0));
        assert!(seg.background.get(0, 1));
    }

    #[test]
    fn half_degree_hue_matches_full_degree_result() {
        let full = three_band_planes(30, 4);
        let half = ColorPlanes::new(30, 4, full.hue().iter().map(|h| h / 2.0).collect()).unwrap();
        let a = HueColorSegmenter::default().segment(&full).unwrap();
        let b = HueColorSegmenter::new(SegmenterParams {
            hue_scale: HueScale::HalfDegrees,
            ..SegmenterParams::default()
        })
        .segment(&half)
        .unwrap();
        assert_eq!(a.fruit, b.fruit);
        assert_eq!(a.stem, b.stem);
    }

    #[test]
    fn threshold_strategy_uses_saturation_gate_and_bands() {
        let hue = vec![10.0, 90.0, 200.0, 350.0, 10.0, 90.0];
        let sat = vec![200.0, 200.0, 200.0, 200.0, 10.0, 10.0];
        let planes = ColorPlanes::new(3, 2, hue)
            .unwrap()
            .with_saturation(sat)
            .unwrap();
        let segmenter = HueColorSegmenter::new(SegmenterParams {
            hue_scale: HueScale::Degrees,
            strategy: SegmentationStrategy::Threshold(ThresholdParams::default()),
        });
        let seg = segmenter.segment(&planes).unwrap();
        assert_partition(&seg);
        assert_eq!(seg.fruit.data, vec![true, false, false, true, false, false]);
        assert_eq!(seg.stem.data, vec![false, true, false, false, false, false]);
        assert_eq!(seg.background.data, vec![false, false, true, false, true, true]);

        let no_sat = ColorPlanes::new(3, 2, vec![0.0; 6]).unwrap();
        assert!(matches!(
            segmenter.segment(&no_sat),
            Err(SegmentError::MissingPlane { .. })
        ));
    }
}
