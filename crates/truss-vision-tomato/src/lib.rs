//! Fruit detection on a binary fruit mask.
//!
//! [`TomatoCircleDetector`] blurs the mask, searches for disks with a
//! gradient-voting circle transform, then applies two consistency filters:
//!
//! - overlap: the fraction of each circle covered by fruit pixels must reach a
//!   threshold;
//! - stem proximity: when stem points are known, each circle must lie within
//!   `ratio_max_dist × mean radius` of one of them.
//!
//! The surviving circles yield a radius³-weighted centroid, which approximates
//! the center of mass of the fruit cluster.

mod detector;
mod filter;
mod hough;
mod radius;

pub use detector::{TomatoCircleDetector, TomatoDetection, TomatoDetectorParams};
pub use filter::{
    filter_by_overlap, filter_by_stem_distance, overlap_ratio, weighted_centroid, TomatoCircle,
};
pub use hough::{find_circles, Circle, HoughParams};
pub use radius::{MmRange, PixelScale, RadiusBounds, RadiusParams, TomatoSize};
