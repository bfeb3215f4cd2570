use std::f32::consts::PI;

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use truss_vision_core::BinaryMask;

use crate::hough::Circle;

/// A circle together with its overlap against the fruit mask.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TomatoCircle {
    pub circle: Circle,
    /// Fraction of the circle area covered by fruit pixels.
    pub overlap_ratio: f32,
}

/// Matched fruit pixels inside the rasterized disk over `π r²`.
///
/// The disk is drawn with integer center and radius (truncated).
pub fn overlap_ratio(mask: &BinaryMask, circle: &Circle) -> f32 {
    if circle.radius <= 0.0 {
        return 0.0;
    }
    let mut disk = BinaryMask::new(mask.width, mask.height);
    disk.fill_disk(
        circle.center.x as i64,
        circle.center.y as i64,
        circle.radius as i64,
        true,
    );
    let matched = disk.overlap_count(mask);
    matched as f32 / (PI * circle.radius * circle.radius)
}

/// Keep circles whose overlap ratio is at least `ratio_threshold`.
/// Returns the survivors (in input order) and the number removed.
pub fn filter_by_overlap(
    circles: &[Circle],
    mask: &BinaryMask,
    ratio_threshold: f32,
) -> (Vec<TomatoCircle>, usize) {
    let kept: Vec<TomatoCircle> = circles
        .iter()
        .map(|c| TomatoCircle {
            circle: *c,
            overlap_ratio: overlap_ratio(mask, c),
        })
        .filter(|t| t.overlap_ratio >= ratio_threshold)
        .collect();
    let removed = circles.len() - kept.len();
    if removed > 0 {
        debug!("removed {removed} circle(s) based on overlap");
    }
    (kept, removed)
}

/// Keep circles whose center lies within `ratio_max_dist × mean radius` of
/// at least one stem point. Returns the survivors and the number removed.
pub fn filter_by_stem_distance(
    circles: &[TomatoCircle],
    stem_points: &[Point2<f32>],
    ratio_max_dist: f32,
) -> (Vec<TomatoCircle>, usize) {
    if circles.is_empty() {
        return (Vec::new(), 0);
    }
    let mean_radius =
        circles.iter().map(|t| t.circle.radius).sum::<f32>() / circles.len() as f32;
    let max_distance = ratio_max_dist * mean_radius;

    let kept: Vec<TomatoCircle> = circles
        .iter()
        .filter(|t| {
            stem_points
                .iter()
                .any(|p| (t.circle.center - *p).norm() <= max_distance)
        })
        .copied()
        .collect();
    let removed = circles.len() - kept.len();
    if removed > 0 {
        debug!(
            "removed {removed} circle(s) farther than {max_distance:.1} px from the stem"
        );
    }
    (kept, removed)
}

/// Radius³-weighted mean of the centers; `None` for an empty set.
pub fn weighted_centroid(circles: &[Circle]) -> Option<Point2<f32>> {
    let (mut sx, mut sy, mut sw) = (0.0f64, 0.0f64, 0.0f64);
    for c in circles {
        let w = (c.radius as f64).powi(3);
        sx += w * c.center.x as f64;
        sy += w * c.center.y as f64;
        sw += w;
    }
    (sw > 0.0).then(|| Point2::new((sx / sw) as f32, (sy / sw) as f32))
}
