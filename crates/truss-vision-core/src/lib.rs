//! Core types and utilities for tomato truss detection.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! depend on any concrete image decoder, clustering routine or skeletonizer.
//!
//! - [`BinaryMask`]: row-major boolean image used for every segment.
//! - [`FrameTransform`]: rigid transform between the original image frame
//!   and the rotated/cropped local frame.
//! - [`Point2D`] / [`PointSet`]: coordinates tagged with the frame they are
//!   expressed in.
//! - [`stem_orientation`] / [`crop_to_truss`]: build the local frame for one image.

mod crop;
mod frame;
mod logger;
mod mask;

pub use crop::{crop_to_truss, stem_orientation, CropBox, CroppedMasks};
pub use frame::{Frame, FrameTransform, Point2D, PointSet};
pub use mask::BinaryMask;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
