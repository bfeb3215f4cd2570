use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use truss_vision_core::BinaryMask;

/// Topological role of a skeleton node.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Degree ≥ 3.
    Junction,
    /// Degree 1.
    Endpoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkeletonNode {
    pub position: Point2<f32>,
    pub kind: NodeKind,
}

impl SkeletonNode {
    pub fn junction(x: f32, y: f32) -> Self {
        Self {
            position: Point2::new(x, y),
            kind: NodeKind::Junction,
        }
    }

    pub fn endpoint(x: f32, y: f32) -> Self {
        Self {
            position: Point2::new(x, y),
            kind: NodeKind::Endpoint,
        }
    }
}

/// One-pixel-wide stem skeleton plus its nodes, in the local frame.
#[derive(Clone, Debug)]
pub struct StemSkeleton {
    pub mask: BinaryMask,
    pub nodes: Vec<SkeletonNode>,
}

impl StemSkeleton {
    pub fn new(mask: BinaryMask, nodes: Vec<SkeletonNode>) -> Self {
        Self { mask, nodes }
    }

    pub fn junctions(&self) -> impl Iterator<Item = Point2<f32>> + '_ {
        self.nodes_of(NodeKind::Junction)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = Point2<f32>> + '_ {
        self.nodes_of(NodeKind::Endpoint)
    }

    fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = Point2<f32>> + '_ {
        self.nodes
            .iter()
            .filter(move |n| n.kind == kind)
            .map(|n| n.position)
    }
}
