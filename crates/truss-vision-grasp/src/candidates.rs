use std::collections::VecDeque;
use std::f32::consts::{FRAC_PI_2, PI};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use truss_vision_core::BinaryMask;

/// A possible grasp location on the stem, in the local frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraspCandidate {
    pub pixel: Point2<f32>,
    /// Segment orientation in radians, folded to `(-π/2, π/2]`.
    pub angle: f32,
    /// Number of skeleton pixels supporting this candidate.
    pub segment_len: usize,
}

/// Turns a suppressed skeleton mask into grasp candidates.
pub trait CandidateExtractor {
    fn extract_candidates(&self, mask: &BinaryMask) -> Vec<GraspCandidate>;
}

/// One candidate per 8-connected skeleton segment.
///
/// Branch points left in the mask are cut out first, so every segment is an
/// open path or a loop. Each segment is walked from an end pixel; the candidate sits on the middle
/// pixel of the walk and its angle is the end-to-end direction. Segments are
/// reported in row-major order of their first pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentExtractor {
    pub min_segment_len: usize,
}

impl Default for SegmentExtractor {
    fn default() -> Self {
        Self { min_segment_len: 3 }
    }
}

impl SegmentExtractor {
    pub fn new(min_segment_len: usize) -> Self {
        Self { min_segment_len }
    }
}

impl CandidateExtractor for SegmentExtractor {
    fn extract_candidates(&self, mask: &BinaryMask) -> Vec<GraspCandidate> {
        let mask = &split_at_branches(mask);
        let mut visited = vec![false; mask.width * mask.height];
        label_components(mask)
            .iter()
            .filter(|c| c.len() >= self.min_segment_len.max(1))
            .map(|pixels| {
                let start = end_pixel(mask, pixels);
                let walk = walk_segment(mask, start, &mut visited);
                candidate_from_walk(&walk, pixels.len())
            })
            .collect()
    }
}

const NEIGHBORS: [(i64, i64); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
    (-1, -1),
];

fn neighbors(
    mask: &BinaryMask,
    (x, y): (usize, usize),
) -> impl Iterator<Item = (usize, usize)> + '_ {
    NEIGHBORS.iter().filter_map(move |&(dx, dy)| {
        let nx = x as i64 + dx;
        let ny = y as i64 + dy;
        mask.get(nx, ny).then_some((nx as usize, ny as usize))
    })
}

/// Clockwise ring around a pixel.
const RING: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Number of separate skeleton runs in the 8-ring of `(x, y)`.
fn crossing_number(mask: &BinaryMask, (x, y): (usize, usize)) -> usize {
    let ring = RING.map(|(dx, dy)| mask.get(x as i64 + dx, y as i64 + dy));
    (0..8).filter(|&i| !ring[i] && ring[(i + 1) % 8]).count()
}

/// Remove branch regions: 8-connected clusters of pixels with three or more
/// neighbors that contain a pixel where three or more runs meet. Staircase
/// corners are crowded too but never cross, so they stay.
fn split_at_branches(mask: &BinaryMask) -> BinaryMask {
    let crowded = BinaryMask::from_fn(mask.width, mask.height, |x, y| {
        mask.get(x as i64, y as i64) && neighbors(mask, (x, y)).count() >= 3
    });
    let mut out = mask.clone();
    for cluster in label_components(&crowded) {
        if cluster.iter().any(|&p| crossing_number(mask, p) >= 3) {
            for (x, y) in cluster {
                out.set(x, y, false);
            }
        }
    }
    out
}

fn label_components(mask: &BinaryMask) -> Vec<Vec<(usize, usize)>> {
    let mut seen = vec![false; mask.width * mask.height];
    let mut components = Vec::new();
    for (x, y) in mask.iter_set() {
        if seen[y * mask.width + x] {
            continue;
        }
        seen[y * mask.width + x] = true;
        let mut pixels = Vec::new();
        let mut queue = VecDeque::from([(x, y)]);
        while let Some(p) = queue.pop_front() {
            pixels.push(p);
            for (nx, ny) in neighbors(mask, p) {
                let idx = ny * mask.width + nx;
                if !seen[idx] {
                    seen[idx] = true;
                    queue.push_back((nx, ny));
                }
            }
        }
        components.push(pixels);
    }
    components
}

/// First pixel (row-major) with a single neighbor; closed loops start at
/// their first pixel.
fn end_pixel(mask: &BinaryMask, pixels: &[(usize, usize)]) -> (usize, usize) {
    pixels
        .iter()
        .copied()
        .filter(|&p| neighbors(mask, p).count() == 1)
        .min_by_key(|&(x, y)| (y, x))
        .or_else(|| pixels.iter().copied().min_by_key(|&(x, y)| (y, x)))
        .unwrap_or((0, 0))
}

fn walk_segment(
    mask: &BinaryMask,
    start: (usize, usize),
    visited: &mut [bool],
) -> Vec<(usize, usize)> {
    let mut walk = vec![start];
    visited[start.1 * mask.width + start.0] = true;
    let mut current = start;
    // axis neighbors come first in NEIGHBORS, so staircases are followed
    // without skipping corner pixels
    while let Some(next) = neighbors(mask, current).find(|&(x, y)| !visited[y * mask.width + x]) {
        visited[next.1 * mask.width + next.0] = true;
        walk.push(next);
        current = next;
    }
    walk
}

fn fold_angle(angle: f32) -> f32 {
    if angle > FRAC_PI_2 {
        angle - PI
    } else if angle <= -FRAC_PI_2 {
        angle + PI
    } else {
        angle
    }
}

fn candidate_from_walk(walk: &[(usize, usize)], segment_len: usize) -> GraspCandidate {
    let (mx, my) = walk[walk.len() / 2];
    let angle = match (walk.first(), walk.last()) {
        (Some(&(x0, y0)), Some(&(x1, y1))) if walk.len() > 1 => {
            fold_angle((y1 as f32 - y0 as f32).atan2(x1 as f32 - x0 as f32))
        }
        _ => 0.0,
    };
    GraspCandidate {
        pixel: Point2::new(mx as f32, my as f32),
        angle,
        segment_len,
    }
}
