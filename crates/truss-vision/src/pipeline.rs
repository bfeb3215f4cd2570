//! Stage-by-stage truss pipeline.
//!
//! [`TrussDetector`] owns the three detectors and exposes each stage as a
//! pure function so callers can stop early, inspect intermediate results or
//! substitute their own collaborators:
//!
//! 1. [`TrussDetector::segment`]: colour planes to fruit/stem/background masks;
//! 2. [`TrussDetector::filter_masks`]: external [`MaskFilter`] (e.g. small blob
//!    removal) applied to fruit and stem;
//! 3. [`TrussDetector::crop`]: rotate the stem horizontal and crop to the truss,
//!    which defines the local frame;
//! 4. external [`Skeletonizer`] on the local stem mask;
//! 5. [`TrussDetector::detect_tomatoes`] and [`TrussDetector::locate_grasp`].
//!
//! [`TrussDetector::process`] runs everything in order.

use log::{info, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use truss_vision_core::{
    crop_to_truss, stem_orientation, BinaryMask, CropBox, CroppedMasks, Frame, FrameTransform,
    Point2D, PointSet,
};
use truss_vision_grasp::{
    GraspContext, GraspParams, GraspPointSelector, GraspResult, StemSkeleton,
};
use truss_vision_segment::{
    ColorPlanes, HueColorSegmenter, SegmentClass, Segmentation, SegmentationSummary,
    SegmenterParams,
};
use truss_vision_tomato::{PixelScale, TomatoCircleDetector, TomatoDetection, TomatoDetectorParams};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::TrussError;

/// Parameters of every stage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrussSettings {
    pub segment: SegmenterParams,
    pub tomato: TomatoDetectorParams,
    pub grasp: GraspParams,
}

/// Cleans a binary mask before cropping.
pub trait MaskFilter {
    fn filter(&self, mask: &BinaryMask) -> BinaryMask;
}

/// Identity [`MaskFilter`].
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFilter;

impl MaskFilter for NoFilter {
    fn filter(&self, mask: &BinaryMask) -> BinaryMask {
        mask.clone()
    }
}

/// Produces a one-pixel-wide skeleton and its nodes from a stem mask.
pub trait Skeletonizer {
    fn skeletonize(&self, stem: &BinaryMask) -> StemSkeleton;
}

impl<F> Skeletonizer for F
where
    F: Fn(&BinaryMask) -> StemSkeleton,
{
    fn skeletonize(&self, stem: &BinaryMask) -> StemSkeleton {
        self(stem)
    }
}

/// Fruit and stem masks after the external filter, in the original frame.
#[derive(Clone, Debug)]
pub struct TrussMasks {
    pub fruit: BinaryMask,
    pub stem: BinaryMask,
}

/// Fruit circles with their positions in both frames.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FruitReport {
    pub detection: TomatoDetection,
    pub centers_original: PointSet,
    pub centroid_local: Option<Point2D>,
    pub centroid_original: Option<Point2D>,
}

impl FruitReport {
    pub fn new(detection: TomatoDetection, transform: &FrameTransform) -> Self {
        let centers_local = PointSet::new(Frame::Local, detection.centers());
        let centroid_local = detection.centroid.map(|c| Point2D {
            frame: Frame::Local,
            coord: c,
        });
        Self {
            centers_original: transform.express_set(&centers_local, Frame::Original),
            centroid_original: centroid_local.map(|c| transform.to_original(&c)),
            centroid_local,
            detection,
        }
    }
}

/// Full result of one image.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrussDetection {
    pub segmentation: SegmentationSummary,
    pub transform: FrameTransform,
    pub bbox: CropBox,
    pub fruit: FruitReport,
    pub grasp: GraspResult,
}

/// Runs the truss pipeline on one image at a time.
#[derive(Clone, Debug, Default)]
pub struct TrussDetector {
    settings: TrussSettings,
    segmenter: HueColorSegmenter,
    tomato: TomatoCircleDetector,
    grasp: GraspPointSelector,
}

impl TrussDetector {
    pub fn new(settings: TrussSettings) -> Self {
        Self {
            segmenter: HueColorSegmenter::new(settings.segment.clone()),
            tomato: TomatoCircleDetector::new(settings.tomato.clone()),
            grasp: GraspPointSelector::new(settings.grasp.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &TrussSettings {
        &self.settings
    }

    pub fn segment(&self, planes: &ColorPlanes) -> Result<Segmentation, TrussError> {
        let seg = self.segmenter.segment(planes)?;
        if !seg.stem_visible {
            info!("stem and background hues coincide, stem treated as not visible");
        }
        Ok(seg)
    }

    /// Apply `filter` to fruit and stem. An empty fruit mask fails; an empty
    /// stem only fails when `require_stem` is set.
    pub fn filter_masks<F: MaskFilter + ?Sized>(
        &self,
        seg: &Segmentation,
        filter: &F,
        require_stem: bool,
    ) -> Result<TrussMasks, TrussError> {
        let fruit = filter.filter(&seg.fruit);
        let stem = filter.filter(&seg.stem);
        if fruit.is_empty() {
            return Err(TrussError::EmptyMask {
                class: SegmentClass::Fruit,
            });
        }
        if require_stem && stem.is_empty() {
            return Err(TrussError::EmptyMask {
                class: SegmentClass::Stem,
            });
        }
        Ok(TrussMasks { fruit, stem })
    }

    /// Rotate so the stem is horizontal and crop to the truss. Without stem
    /// pixels the rotation is zero.
    pub fn crop(&self, masks: &TrussMasks) -> Result<CroppedMasks, TrussError> {
        let angle = stem_orientation(&masks.stem).unwrap_or(0.0);
        let cropped =
            crop_to_truss(&masks.fruit, &masks.stem, angle).ok_or(TrussError::EmptyTruss)?;
        info!(
            "truss crop: angle {:.3} rad, {}x{} px at ({}, {})",
            angle, cropped.bbox.width, cropped.bbox.height, cropped.bbox.x, cropped.bbox.y
        );
        Ok(cropped)
    }

    /// Fruit circles on the local fruit mask. A missing centroid is reported
    /// through the result, not as an error.
    pub fn detect_tomatoes(
        &self,
        cropped: &CroppedMasks,
        scale: Option<PixelScale>,
        stem_points: Option<&[Point2<f32>]>,
    ) -> FruitReport {
        let detection = self.tomato.detect(&cropped.fruit, scale, stem_points);
        FruitReport::new(detection, &cropped.transform)
    }

    pub fn locate_grasp(
        &self,
        skeleton: &StemSkeleton,
        ctx: &GraspContext,
    ) -> Result<GraspResult, TrussError> {
        Ok(self.grasp.select(skeleton, ctx)?)
    }

    /// Run every stage on one image.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, planes, filter, skeletonizer),
            fields(width = planes.width(), height = planes.height())
        )
    )]
    pub fn process<F, S>(
        &self,
        planes: &ColorPlanes,
        filter: &F,
        skeletonizer: &S,
        scale: Option<PixelScale>,
    ) -> Result<TrussDetection, TrussError>
    where
        F: MaskFilter + ?Sized,
        S: Skeletonizer + ?Sized,
    {
        let seg = self.segment(planes)?;
        let masks = self.filter_masks(&seg, filter, true)?;
        let cropped = self.crop(&masks)?;

        let skeleton = skeletonizer.skeletonize(&cropped.stem);
        let junctions: Vec<Point2<f32>> = skeleton.junctions().collect();
        let fruit = self.detect_tomatoes(&cropped, scale, Some(&junctions));
        let Some(centroid) = fruit.detection.centroid else {
            warn!("no fruit circle survived filtering");
            return Err(TrussError::NoViableCircles);
        };

        let ctx = GraspContext {
            transform: cropped.transform,
            centroid: Some(centroid),
            original_size: Some([planes.width(), planes.height()]),
        };
        let grasp = self.locate_grasp(&skeleton, &ctx)?;

        Ok(TrussDetection {
            segmentation: SegmentationSummary::from(&seg),
            transform: cropped.transform,
            bbox: cropped.bbox,
            fruit,
            grasp,
        })
    }
}
