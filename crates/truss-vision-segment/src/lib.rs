//! Colour segmentation of a tomato truss image.
//!
//! [`HueColorSegmenter`] classifies every pixel into fruit, stem or background.
//! The default strategy clusters pixels on the hue circle (optionally extended
//! by normalized chroma and saturation) with three centers seeded from class
//! priors, then maps clusters to classes by circular hue distance to the
//! priors. A fixed-threshold strategy is available as an alternative.
//!
//! ```
//! use truss_vision_segment::{ColorPlanes, HueColorSegmenter};
//!
//! let planes = ColorPlanes::new(4, 1, vec![0.0, 5.0, 100.0, 240.0])?;
//! let seg = HueColorSegmenter::default().segment(&planes)?;
//! assert!(seg.fruit.get(0, 0));
//! assert!(seg.stem.get(2, 0));
//! # Ok::<(), truss_vision_segment::SegmentError>(())
//! ```

mod error;
mod hue;
mod kmeans;
mod labels;
mod params;
mod planes;
mod segmenter;

pub use error::SegmentError;
pub use hue::{angular_distance_deg, wrap_deg, HueScale};
pub use labels::{resolve_labels, ClassLabels, SegmentClass};
pub use params::{
    ClassPriors, ClusterCenter, ClusterSeeding, ClusteringParams, HueBand, SegmentationStrategy,
    SegmenterParams, ThresholdParams,
};
pub use planes::ColorPlanes;
pub use segmenter::{segment_truss, HueColorSegmenter, Segmentation, SegmentationSummary};
