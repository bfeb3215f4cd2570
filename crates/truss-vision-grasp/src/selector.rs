use log::{debug, info};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use truss_vision_core::{Frame, FrameTransform, Point2D, PointSet};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::candidates::{CandidateExtractor, GraspCandidate, SegmentExtractor};
use crate::error::GraspError;
use crate::policy::{select_best, SelectionPolicy};
use crate::skeleton::StemSkeleton;
use crate::suppress::{suppress_nodes, suppression_radius};

/// Parameters of [`GraspPointSelector`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GraspParams {
    /// Node suppression radius as a fraction of `mean(width, height)`.
    pub node_radius_frac: f32,
    pub extractor: SegmentExtractor,
    pub policy: SelectionPolicy,
}

impl Default for GraspParams {
    fn default() -> Self {
        Self {
            node_radius_frac: 0.02,
            extractor: SegmentExtractor::default(),
            policy: SelectionPolicy::default(),
        }
    }
}

/// Per-image inputs the policies draw their target from.
#[derive(Clone, Copy, Debug, Default)]
pub struct GraspContext {
    pub transform: FrameTransform,
    /// Fruit centroid in the local frame.
    pub centroid: Option<Point2<f32>>,
    /// `[width, height]` of the original image.
    pub original_size: Option<[usize; 2]>,
}

/// Selected grasp point with frame-aware diagnostics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraspResult {
    pub policy: SelectionPolicy,
    /// Policy target in the local frame.
    pub target: Point2D,
    pub candidate: GraspCandidate,
    pub point_local: Point2D,
    pub point_original: Point2D,
    pub angle_local: f32,
    pub angle_original: f32,
    pub suppression_radius: i64,
    pub candidates_local: PointSet,
    pub candidates_original: PointSet,
    /// Skeleton pixels left after node suppression.
    pub suppressed_local: PointSet,
    pub suppressed_original: PointSet,
}

/// Picks one grasp point on the stem skeleton.
#[derive(Clone, Debug, Default)]
pub struct GraspPointSelector {
    params: GraspParams,
}

impl GraspPointSelector {
    pub fn new(params: GraspParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GraspParams {
        &self.params
    }

    /// Select with the configured [`SegmentExtractor`].
    pub fn select(
        &self,
        skeleton: &StemSkeleton,
        ctx: &GraspContext,
    ) -> Result<GraspResult, GraspError> {
        self.select_with(&self.params.extractor, skeleton, ctx)
    }

    /// Suppress node neighbourhoods, extract candidates with `extractor` and
    /// pick one according to the configured policy.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, extractor, skeleton, ctx),
            fields(nodes = skeleton.nodes.len(), policy = %self.params.policy)
        )
    )]
    pub fn select_with<E: CandidateExtractor + ?Sized>(
        &self,
        extractor: &E,
        skeleton: &StemSkeleton,
        ctx: &GraspContext,
    ) -> Result<GraspResult, GraspError> {
        let mask = &skeleton.mask;
        let radius = suppression_radius(mask.width, mask.height, self.params.node_radius_frac);
        let (suppressed, removed) = suppress_nodes(mask, &skeleton.nodes, radius);

        let candidates = extractor.extract_candidates(&suppressed);
        debug!("{} grasp candidate(s) after suppression", candidates.len());
        if candidates.is_empty() {
            return Err(GraspError::NoCandidate { removed });
        }

        let policy = self.params.policy;
        let target = resolve_target(policy, skeleton, ctx)?;
        let best = select_best(&candidates, policy, target)
            .ok_or(GraspError::NoCandidate { removed })?;
        let candidate = candidates[best];

        let tf = &ctx.transform;
        let point_local = Point2D {
            frame: Frame::Local,
            coord: candidate.pixel,
        };
        let point_original = tf.to_original(&point_local);
        let angle_original = tf.angle_to_original(candidate.angle);
        info!(
            "grasp point ({:.1}, {:.1}) local, ({:.1}, {:.1}) original, angle {:.3} rad",
            point_local.coord.x,
            point_local.coord.y,
            point_original.coord.x,
            point_original.coord.y,
            angle_original
        );

        let candidates_local = PointSet::new(
            Frame::Local,
            candidates.iter().map(|c| c.pixel).collect(),
        );
        let suppressed_local = PointSet::from_pixels(Frame::Local, suppressed.iter_set());
        Ok(GraspResult {
            policy,
            target: Point2D {
                frame: Frame::Local,
                coord: target,
            },
            candidate,
            point_local,
            point_original,
            angle_local: candidate.angle,
            angle_original,
            suppression_radius: radius,
            candidates_original: tf.express_set(&candidates_local, Frame::Original),
            candidates_local,
            suppressed_original: tf.express_set(&suppressed_local, Frame::Original),
            suppressed_local,
        })
    }
}

fn resolve_target(
    policy: SelectionPolicy,
    skeleton: &StemSkeleton,
    ctx: &GraspContext,
) -> Result<Point2<f32>, GraspError> {
    let target = match policy {
        SelectionPolicy::CenterOfMass => ctx.centroid,
        SelectionPolicy::StemMidpoint => {
            let mut ends = skeleton.endpoints();
            match (ends.next(), ends.next()) {
                (Some(a), Some(b)) => Some(nalgebra::center(&a, &b)),
                _ => None,
            }
        }
        SelectionPolicy::StemEnd => skeleton
            .endpoints()
            .fold(None, |best: Option<Point2<f32>>, p| match best {
                Some(b) if b.x >= p.x => Some(b),
                _ => Some(p),
            }),
        SelectionPolicy::ImageCenter => ctx.original_size.map(|[w, h]| {
            ctx.transform
                .map_to_local(Point2::new(w as f32 * 0.5, h as f32 * 0.5))
        }),
    };
    target.ok_or(GraspError::MissingTarget { policy })
}
