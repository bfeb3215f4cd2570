//! Gradient-voting circle search on a smoothed mask.
//!
//! Every edge pixel votes along its gradient, toward the bright interior, at
//! each radius in the allowed interval. Centers of bright disks collect the
//! votes of their whole rim. Peaks of the smoothed accumulator are kept by
//! non-maximum suppression and a minimum center distance, then each center
//! gets the radius with the strongest rim support.

use image::{GrayImage, ImageBuffer, Luma};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::radius::RadiusBounds;

/// A circle candidate in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2<f32>,
    pub radius: f32,
    /// Smoothed accumulator value at the center.
    pub votes: f32,
}

impl Circle {
    pub fn new(x: f32, y: f32, radius: f32) -> Self {
        Self {
            center: Point2::new(x, y),
            radius,
            votes: 0.0,
        }
    }
}

/// Configuration of the circle search.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HoughParams {
    /// Gradient magnitude threshold (fraction of the maximum).
    pub grad_threshold: f32,
    /// Gaussian sigma for accumulator smoothing; 0 disables smoothing.
    pub accum_sigma: f32,
    /// Minimum accumulator value for a center (fraction of the maximum).
    pub min_vote_frac: f32,
    /// NMS radius for peak extraction (pixels).
    pub nms_radius: f32,
    /// Minimum cosine between an edge gradient and the direction to the
    /// center for the edge to support a radius.
    pub min_alignment: f32,
}

impl Default for HoughParams {
    fn default() -> Self {
        Self {
            grad_threshold: 0.2,
            accum_sigma: 1.5,
            min_vote_frac: 0.3,
            nms_radius: 3.0,
            min_alignment: 0.7,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct EdgePixel {
    x: f32,
    y: f32,
    /// Unit gradient direction.
    dx: f32,
    dy: f32,
    mag: f32,
}

fn edge_pixels(img: &GrayImage, grad_threshold: f32) -> Vec<EdgePixel> {
    let (w, h) = img.dimensions();
    let gx = imageproc::gradients::horizontal_scharr(img);
    let gy = imageproc::gradients::vertical_scharr(img);
    let (gx, gy) = (gx.as_raw(), gy.as_raw());

    let max_mag = gx
        .iter()
        .zip(gy.iter())
        .map(|(&a, &b)| (a as f32).hypot(b as f32))
        .fold(0.0f32, f32::max);
    if max_mag < 1e-6 {
        return Vec::new();
    }
    let threshold = grad_threshold * max_mag;

    let mut edges = Vec::new();
    for y in 0..h as usize {
        for x in 0..w as usize {
            let idx = y * w as usize + x;
            let (a, b) = (gx[idx] as f32, gy[idx] as f32);
            let mag = a.hypot(b);
            if mag < threshold || mag < 1e-6 {
                continue;
            }
            let (mut dx, mut dy) = (a / mag, b / mag);
            // point toward the brighter side
            if intensity_at(img, x as f32 + 2.0 * dx, y as f32 + 2.0 * dy)
                < intensity_at(img, x as f32 - 2.0 * dx, y as f32 - 2.0 * dy)
            {
                dx = -dx;
                dy = -dy;
            }
            edges.push(EdgePixel {
                x: x as f32,
                y: y as f32,
                dx,
                dy,
                mag,
            });
        }
    }
    edges
}

/// Nearest-pixel intensity, clamped to the image.
#[inline]
fn intensity_at(img: &GrayImage, x: f32, y: f32) -> u8 {
    let (w, h) = img.dimensions();
    let xi = (x.round().max(0.0) as u32).min(w - 1);
    let yi = (y.round().max(0.0) as u32).min(h - 1);
    img.get_pixel(xi, yi)[0]
}

/// Deposit a weighted vote with bilinear interpolation.
#[inline]
fn bilinear_add(accum: &mut [f32], w: usize, x: f32, y: f32, weight: f32) {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;
    let base = y0 * w + x0;
    accum[base] += weight * (1.0 - fx) * (1.0 - fy);
    accum[base + 1] += weight * fx * (1.0 - fy);
    accum[base + w] += weight * (1.0 - fx) * fy;
    accum[base + w + 1] += weight * fx * fy;
}

fn vote(edges: &[EdgePixel], w: usize, h: usize, bounds: RadiusBounds) -> Vec<f32> {
    let mut accum = vec![0.0f32; w * h];
    let (x_lim, y_lim) = ((w - 1) as f32, (h - 1) as f32);
    for e in edges {
        for r in bounds.min_px..=bounds.max_px {
            let r = r as f32;
            let vx = e.x + e.dx * r;
            let vy = e.y + e.dy * r;
            if vx >= 0.0 && vx < x_lim && vy >= 0.0 && vy < y_lim {
                bilinear_add(&mut accum, w, vx, vy, e.mag);
            }
        }
    }
    accum
}

fn smooth(accum: Vec<f32>, w: u32, h: u32, sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return accum;
    }
    match ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w, h, accum) {
        Some(img) => imageproc::filter::gaussian_blur_f32(&img, sigma).into_raw(),
        None => Vec::new(),
    }
}

/// Local maxima above `min_vote_frac · max`, strongest first.
fn find_peaks(acc: &[f32], w: usize, h: usize, params: &HoughParams) -> Vec<(usize, f32)> {
    let max_val = acc.iter().copied().fold(0.0f32, f32::max);
    if max_val < 1e-6 {
        return Vec::new();
    }
    let vote_threshold = params.min_vote_frac * max_val;
    let nms_r = params.nms_radius.ceil().max(1.0) as i64;
    let nms_r2 = params.nms_radius * params.nms_radius;

    let mut peaks = Vec::new();
    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let idx = y as usize * w + x as usize;
            let val = acc[idx];
            if val < vote_threshold {
                continue;
            }
            let mut is_max = true;
            'outer: for dy in -nms_r..=nms_r {
                for dx in -nms_r..=nms_r {
                    if (dx == 0 && dy == 0) || (dx * dx + dy * dy) as f32 > nms_r2 {
                        continue;
                    }
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= w as i64 || ny >= h as i64 {
                        continue;
                    }
                    let nidx = ny as usize * w + nx as usize;
                    if acc[nidx] > val || (acc[nidx] == val && nidx < idx) {
                        is_max = false;
                        break 'outer;
                    }
                }
            }
            if is_max {
                peaks.push((idx, val));
            }
        }
    }
    peaks.sort_by(|a, b| b.1.total_cmp(&a.1));
    peaks
}

/// 3×3 weighted centroid around an accumulator peak.
fn refine_peak(acc: &[f32], w: usize, h: usize, idx: usize) -> Point2<f32> {
    let (px, py) = ((idx % w) as i64, (idx / w) as i64);
    let (mut sx, mut sy, mut sw) = (0.0f32, 0.0f32, 0.0f32);
    for ny in (py - 1).max(0)..=(py + 1).min(h as i64 - 1) {
        for nx in (px - 1).max(0)..=(px + 1).min(w as i64 - 1) {
            let v = acc[ny as usize * w + nx as usize];
            sx += v * nx as f32;
            sy += v * ny as f32;
            sw += v;
        }
    }
    if sw > 0.0 {
        Point2::new(sx / sw, sy / sw)
    } else {
        Point2::new(px as f32, py as f32)
    }
}

/// Radius with the strongest aligned rim support, normalized by circumference.
fn estimate_radius(
    edges: &[EdgePixel],
    center: Point2<f32>,
    bounds: RadiusBounds,
    min_alignment: f32,
) -> Option<f32> {
    let (r_lo, r_hi) = (bounds.min_px as usize, bounds.max_px as usize);
    let mut hist = vec![0.0f32; r_hi - r_lo + 1];
    for e in edges {
        let vx = center.x - e.x;
        let vy = center.y - e.y;
        let d = vx.hypot(vy);
        if d < 1e-3 {
            continue;
        }
        let bin = d.round() as usize;
        if bin < r_lo || bin > r_hi {
            continue;
        }
        let alignment = (e.dx * vx + e.dy * vy) / d;
        if alignment < min_alignment {
            continue;
        }
        hist[bin - r_lo] += e.mag * alignment;
    }

    let (best, best_score) = hist
        .iter()
        .enumerate()
        .map(|(i, &v)| (i, v / (r_lo + i) as f32))
        .fold((0usize, 0.0f32), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
    if best_score <= 0.0 {
        return None;
    }

    // sub-bin refinement over the neighbouring bins
    let lo = best.saturating_sub(1);
    let hi = (best + 1).min(hist.len() - 1);
    let (mut sr, mut sw) = (0.0f32, 0.0f32);
    for (i, &v) in hist.iter().enumerate().take(hi + 1).skip(lo) {
        sr += v * (r_lo + i) as f32;
        sw += v;
    }
    Some((sr / sw).clamp(r_lo as f32, r_hi as f32))
}

/// Search for bright disks with radius in `bounds` whose centers are at
/// least `bounds.min_center_distance()` apart. Strongest first.
pub fn find_circles(img: &GrayImage, bounds: RadiusBounds, params: &HoughParams) -> Vec<Circle> {
    let (w, h) = img.dimensions();
    if w < 4 || h < 4 {
        return Vec::new();
    }
    let (wu, hu) = (w as usize, h as usize);

    let edges = edge_pixels(img, params.grad_threshold);
    if edges.is_empty() {
        return Vec::new();
    }
    let accum = smooth(vote(&edges, wu, hu, bounds), w, h, params.accum_sigma);
    if accum.len() != wu * hu {
        return Vec::new();
    }

    let min_dist = bounds.min_center_distance();
    let mut circles: Vec<Circle> = Vec::new();
    for (idx, votes) in find_peaks(&accum, wu, hu, params) {
        let center = refine_peak(&accum, wu, hu, idx);
        if circles
            .iter()
            .any(|c| (c.center - center).norm() < min_dist)
        {
            continue;
        }
        if let Some(radius) = estimate_radius(&edges, center, bounds, params.min_alignment) {
            circles.push(Circle {
                center,
                radius,
                votes,
            });
        }
    }
    circles
}
