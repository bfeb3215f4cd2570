//! Rotate-and-crop stage that defines the local frame of one image.
//!
//! The stem is turned horizontal by rotating with `-stem_angle`, then the
//! bounding box of the truss (fruit ∪ stem) in rotated coordinates becomes the
//! local image. Masks are resampled with inverse nearest-neighbour mapping.

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{BinaryMask, FrameTransform};

/// Axis-aligned crop rectangle in rotated (pre-translation) coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropBox {
    pub x: i64,
    pub y: i64,
    pub width: usize,
    pub height: usize,
}

/// Output of [`crop_to_truss`].
#[derive(Clone, Debug)]
pub struct CroppedMasks {
    pub transform: FrameTransform,
    pub bbox: CropBox,
    pub fruit: BinaryMask,
    pub stem: BinaryMask,
}

/// Principal-axis orientation of a mask in radians, in `(-π/2, π/2]`.
///
/// Uses the double-angle form of the central second moments, so the result
/// does not depend on pixel order. `None` for an empty mask.
pub fn stem_orientation(mask: &BinaryMask) -> Option<f32> {
    let n = mask.count();
    if n == 0 {
        return None;
    }

    let (mut sx, mut sy) = (0.0f64, 0.0f64);
    for (x, y) in mask.iter_set() {
        sx += x as f64;
        sy += y as f64;
    }
    let mx = sx / n as f64;
    let my = sy / n as f64;

    let (mut mu20, mut mu02, mut mu11) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in mask.iter_set() {
        let dx = x as f64 - mx;
        let dy = y as f64 - my;
        mu20 += dx * dx;
        mu02 += dy * dy;
        mu11 += dx * dy;
    }

    Some((0.5 * (2.0 * mu11).atan2(mu20 - mu02)) as f32)
}

/// Rotate both masks by `-stem_angle` and crop to the bounding box of their
/// union.
///
/// Returns `None` when the union is empty; there is no truss to crop.
pub fn crop_to_truss(
    fruit: &BinaryMask,
    stem: &BinaryMask,
    stem_angle: f32,
) -> Option<CroppedMasks> {
    assert!(fruit.same_shape(stem), "mask shapes differ");

    let rotation = FrameTransform::new(-stem_angle, [0.0, 0.0]);
    let truss = fruit.union(stem);

    let mut lo = Point2::new(f32::INFINITY, f32::INFINITY);
    let mut hi = Point2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
    for (x, y) in truss.iter_set() {
        let r = rotation.map_to_local(Point2::new(x as f32, y as f32));
        lo.x = lo.x.min(r.x);
        lo.y = lo.y.min(r.y);
        hi.x = hi.x.max(r.x);
        hi.y = hi.y.max(r.y);
    }
    if !lo.x.is_finite() {
        debug!("crop: empty truss");
        return None;
    }

    let ox = lo.x.floor();
    let oy = lo.y.floor();
    let bbox = CropBox {
        x: ox as i64,
        y: oy as i64,
        width: (hi.x - ox).ceil() as usize + 1,
        height: (hi.y - oy).ceil() as usize + 1,
    };
    let transform = FrameTransform::new(-stem_angle, [ox, oy]);

    let fruit_local = resample(fruit, &transform, bbox.width, bbox.height);
    let stem_local = resample(stem, &transform, bbox.width, bbox.height);

    debug!(
        "crop: angle={:.3} rad, box {}x{} at ({}, {})",
        -stem_angle, bbox.width, bbox.height, bbox.x, bbox.y
    );

    Some(CroppedMasks {
        transform,
        bbox,
        fruit: fruit_local,
        stem: stem_local,
    })
}

fn resample(src: &BinaryMask, transform: &FrameTransform, out_w: usize, out_h: usize) -> BinaryMask {
    BinaryMask::from_fn(out_w, out_h, |x, y| {
        let p = transform.map_to_original(Point2::new(x as f32, y as f32));
        src.get(p.x.round() as i64, p.y.round() as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Frame, Point2D};
    use approx::assert_abs_diff_eq;
    use std::f32::consts::FRAC_PI_4;

    fn diagonal_band(size: usize, half_width: i64) -> BinaryMask {
        BinaryMask::from_fn(size, size, |x, y| (x as i64 - y as i64).abs() <= half_width)
    }

    #[test]
    fn orientation_of_horizontal_and_diagonal_strokes() {
        let horizontal = BinaryMask::from_fn(20, 10, |_, y| y == 4);
        assert_abs_diff_eq!(stem_orientation(&horizontal).unwrap(), 0.0, epsilon = 1e-6);

        let diagonal = diagonal_band(30, 0);
        assert_abs_diff_eq!(stem_orientation(&diagonal).unwrap(), FRAC_PI_4, epsilon = 1e-5);

        assert!(stem_orientation(&BinaryMask::new(4, 4)).is_none());
    }

    #[test]
    fn zero_angle_crop_is_a_plain_bounding_box() {
        let fruit = BinaryMask::from_fn(16, 12, |x, y| (3..=6).contains(&x) && (2..=5).contains(&y));
        let stem = BinaryMask::from_fn(16, 12, |x, y| y == 4 && (7..=11).contains(&x));

        let crop = crop_to_truss(&fruit, &stem, 0.0).unwrap();
        assert_eq!(
            crop.bbox,
            CropBox {
                x: 3,
                y: 2,
                width: 9,
                height: 4
            }
        );
        assert_eq!(crop.transform.translation(), [3.0, 2.0]);
        assert_eq!(crop.fruit.count(), fruit.count());
        assert_eq!(crop.stem.count(), stem.count());
        assert!(crop.stem.get(4, 2));
        assert!(crop.fruit.get(0, 0));
    }

    #[test]
    fn rotated_crop_turns_the_stem_horizontal() {
        let stem = diagonal_band(40, 1);
        let fruit = BinaryMask::new(40, 40);
        let angle = stem_orientation(&stem).unwrap();

        let crop = crop_to_truss(&fruit, &stem, angle).unwrap();
        let local_angle = stem_orientation(&crop.stem).unwrap();
        assert!(local_angle.abs() < 0.1, "local angle {local_angle}");
        assert!(crop.stem.width > crop.stem.height);
    }

    #[test]
    fn every_truss_pixel_lands_inside_the_local_image() {
        let fruit = BinaryMask::from_fn(50, 40, |x, y| {
            let dx = x as f32 - 20.0;
            let dy = y as f32 - 22.0;
            dx * dx + dy * dy <= 64.0
        });
        let stem = BinaryMask::from_fn(50, 40, |x, y| y + 10 == x && x < 45);
        let crop = crop_to_truss(&fruit, &stem, 0.6).unwrap();

        let w = crop.bbox.width as f32;
        let h = crop.bbox.height as f32;
        for (x, y) in fruit.union(&stem).iter_set() {
            let p = crop
                .transform
                .to_local(&Point2D::original(x as f32, y as f32));
            assert_eq!(p.frame, Frame::Local);
            assert!(p.coord.x >= -1e-3 && p.coord.x < w, "x {}", p.coord.x);
            assert!(p.coord.y >= -1e-3 && p.coord.y < h, "y {}", p.coord.y);
        }
    }

    #[test]
    fn empty_truss_cannot_be_cropped() {
        let empty = BinaryMask::new(8, 8);
        assert!(crop_to_truss(&empty, &empty, 0.3).is_none());
    }
}
