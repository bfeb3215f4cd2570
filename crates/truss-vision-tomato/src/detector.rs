use image::{GrayImage, Luma};
use log::{debug, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use truss_vision_core::BinaryMask;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::filter::{filter_by_overlap, filter_by_stem_distance, weighted_centroid, TomatoCircle};
use crate::hough::{find_circles, Circle, HoughParams};
use crate::radius::{PixelScale, RadiusBounds, RadiusParams};

/// Parameters of [`TomatoCircleDetector`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TomatoDetectorParams {
    /// Gaussian sigma applied to the mask before the circle search.
    pub blur_sigma: f32,
    pub radius: RadiusParams,
    pub hough: HoughParams,
    /// Minimum fraction of a circle that must be covered by fruit.
    pub ratio_threshold: f32,
    /// Maximum center-to-stem distance in units of the mean radius.
    pub ratio_max_dist: f32,
}

impl Default for TomatoDetectorParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.5,
            radius: RadiusParams::default(),
            hough: HoughParams::default(),
            ratio_threshold: 0.5,
            ratio_max_dist: 4.0,
        }
    }
}

/// Result of one fruit detection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TomatoDetection {
    pub bounds: RadiusBounds,
    /// Raw circle search output, strongest first.
    pub candidates: Vec<Circle>,
    /// Circles that passed every filter.
    pub circles: Vec<TomatoCircle>,
    pub removed_by_overlap: usize,
    pub removed_by_distance: usize,
    /// Radius³-weighted center of the retained circles.
    pub centroid: Option<Point2<f32>>,
}

impl TomatoDetection {
    pub fn radii(&self) -> Vec<f32> {
        self.circles.iter().map(|t| t.circle.radius).collect()
    }

    pub fn centers(&self) -> Vec<Point2<f32>> {
        self.circles.iter().map(|t| t.circle.center).collect()
    }
}

/// Finds individual fruit as circles inside a fruit mask.
#[derive(Clone, Debug, Default)]
pub struct TomatoCircleDetector {
    params: TomatoDetectorParams,
}

impl TomatoCircleDetector {
    pub fn new(params: TomatoDetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TomatoDetectorParams {
        &self.params
    }

    /// Detect fruit circles.
    ///
    /// `scale` selects physical radius bounds; without it the bounds follow the
    /// mask width. The stem-proximity filter runs only for a non-empty
    /// `stem_points`. An empty result is reported as `centroid == None`.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, fruit, stem_points),
            fields(width = fruit.width, height = fruit.height)
        )
    )]
    pub fn detect(
        &self,
        fruit: &BinaryMask,
        scale: Option<PixelScale>,
        stem_points: Option<&[Point2<f32>]>,
    ) -> TomatoDetection {
        let bounds = RadiusBounds::resolve(&self.params.radius, fruit.width, scale);
        let blurred = blur_mask(fruit, self.params.blur_sigma);
        let candidates = find_circles(&blurred, bounds, &self.params.hough);
        debug!(
            "circle search: {} candidate(s), radius {}..{} px",
            candidates.len(),
            bounds.min_px,
            bounds.max_px
        );

        let (mut circles, removed_by_overlap) =
            filter_by_overlap(&candidates, fruit, self.params.ratio_threshold);

        let mut removed_by_distance = 0;
        if let Some(points) = stem_points.filter(|p| !p.is_empty()) {
            let (kept, removed) =
                filter_by_stem_distance(&circles, points, self.params.ratio_max_dist);
            circles = kept;
            removed_by_distance = removed;
        }

        let retained: Vec<Circle> = circles.iter().map(|t| t.circle).collect();
        let centroid = weighted_centroid(&retained);
        if centroid.is_none() {
            warn!("no fruit circle survived filtering");
        }

        TomatoDetection {
            bounds,
            candidates,
            circles,
            removed_by_overlap,
            removed_by_distance,
            centroid,
        }
    }
}

fn blur_mask(mask: &BinaryMask, sigma: f32) -> GrayImage {
    let img = GrayImage::from_fn(mask.width as u32, mask.height as u32, |x, y| {
        Luma([if mask.get(x as i64, y as i64) { 255 } else { 0 }])
    });
    if sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&img, sigma)
    } else {
        img
    }
}
