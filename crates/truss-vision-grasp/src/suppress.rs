use log::debug;
use truss_vision_core::BinaryMask;

use crate::skeleton::SkeletonNode;

/// Suppression radius in pixels: `frac × mean(width, height)`, truncated and
/// at least 1 so a node always takes its 4-neighbors with it.
pub fn suppression_radius(width: usize, height: usize, frac: f32) -> i64 {
    ((frac * (width + height) as f32 * 0.5).max(0.0) as i64).max(1)
}

/// Clear a disk of `radius` around every node on a copy of `mask`.
///
/// Returns the suppressed mask and the number of pixels removed. Applying it
/// again with the same nodes removes nothing.
pub fn suppress_nodes(
    mask: &BinaryMask,
    nodes: &[SkeletonNode],
    radius: i64,
) -> (BinaryMask, usize) {
    let mut out = mask.clone();
    let removed: usize = nodes
        .iter()
        .map(|n| {
            out.fill_disk(
                n.position.x.round() as i64,
                n.position.y.round() as i64,
                radius,
                false,
            )
        })
        .sum();
    debug!(
        "node suppression: {} node(s), radius {radius} px, removed {removed} px",
        nodes.len()
    );
    (out, removed)
}
