//! High-level facade crate for the `truss-vision-*` workspace.
//!
//! This crate provides:
//! - re-exports of the underlying stage crates;
//! - [`TrussDetector`], which runs segmentation, rotate-and-crop, fruit
//!   detection and grasp selection on one image;
//! - JSON config/report helpers ([`io`]);
//! - (feature `image`) conversion of RGB images into colour planes.
//!
//! ## Quickstart
//!
//! ```no_run
//! use truss_vision::detect::color_planes;
//! use truss_vision::{NoFilter, TrussDetector};
//! use truss_vision::grasp::{SkeletonNode, StemSkeleton};
//! use truss_vision::core::BinaryMask;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("truss.png")?.to_rgb8();
//! let planes = color_planes(&img)?;
//!
//! // A real skeletonizer thins the stem and finds its nodes.
//! let skeletonize = |stem: &BinaryMask| StemSkeleton::new(stem.clone(), Vec::<SkeletonNode>::new());
//!
//! let detector = TrussDetector::default();
//! let result = detector.process(&planes, &NoFilter, &skeletonize, None)?;
//! println!("grasp at {:?}", result.grasp.point_original);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `truss_vision::core`: masks, frames and the frame transform.
//! - `truss_vision::segment`: hue clustering into fruit, stem and background.
//! - `truss_vision::tomato`: fruit circles and their centroid.
//! - `truss_vision::grasp`: grasp point selection on the stem skeleton.
//! - `truss_vision::detect` (feature `image`): helpers from `image::RgbImage`.

pub use truss_vision_core as core;
pub use truss_vision_grasp as grasp;
pub use truss_vision_segment as segment;
pub use truss_vision_tomato as tomato;

pub use truss_vision_core::{BinaryMask, Frame, FrameTransform, Point2D, PointSet};

mod error;
pub mod io;
mod pipeline;

#[cfg(feature = "image")]
pub mod detect;

pub use error::TrussError;
pub use pipeline::{
    FruitReport, MaskFilter, NoFilter, Skeletonizer, TrussDetection, TrussDetector, TrussMasks,
    TrussSettings,
};
