//! `image`-based helpers: RGB images to colour planes and mask images.

use image::{GrayImage, Luma, RgbImage};
use palette::{FromColor, Hsv, Lab, LinSrgb, Srgb};
use truss_vision_core::BinaryMask;
use truss_vision_segment::{ColorPlanes, SegmentError};
use truss_vision_tomato::PixelScale;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::TrussError;
use crate::pipeline::{MaskFilter, Skeletonizer, TrussDetection, TrussDetector};

fn srgb(rgb: [u8; 3]) -> Srgb<f32> {
    Srgb::new(rgb[0], rgb[1], rgb[2]).into_format()
}

/// HSV hue in degrees `[0, 360)`, 0 for grey pixels.
pub fn hue_deg(rgb: [u8; 3]) -> f32 {
    let hsv: Hsv = Hsv::from_color(srgb(rgb));
    hsv.hue.into_positive_degrees() % 360.0
}

/// HSV saturation on the 8-bit scale `[0, 255]`.
pub fn saturation_u8(rgb: [u8; 3]) -> f32 {
    let hsv: Hsv = Hsv::from_color(srgb(rgb));
    255.0 * hsv.saturation
}

/// CIE L*a*b* `a*` (green–red axis) under D65.
pub fn lab_a(rgb: [u8; 3]) -> f32 {
    let lin: LinSrgb<f32> = srgb(rgb).into_linear();
    let lab: Lab = Lab::from_color(lin);
    lab.a
}

/// Hue (degrees), Lab `a*` chroma and HSV saturation planes of an RGB image.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img), fields(width = img.width(), height = img.height()))
)]
pub fn color_planes(img: &RgbImage) -> Result<ColorPlanes, SegmentError> {
    let n = img.width() as usize * img.height() as usize;
    let mut hue = Vec::with_capacity(n);
    let mut chroma = Vec::with_capacity(n);
    let mut saturation = Vec::with_capacity(n);
    for p in img.pixels() {
        hue.push(hue_deg(p.0));
        chroma.push(lab_a(p.0));
        saturation.push(saturation_u8(p.0));
    }
    ColorPlanes::new(img.width() as usize, img.height() as usize, hue)?
        .with_chroma(chroma)?
        .with_saturation(saturation)
}

/// 0 / 255 grayscale image of a mask.
pub fn mask_to_image(mask: &BinaryMask) -> GrayImage {
    GrayImage::from_fn(mask.width as u32, mask.height as u32, |x, y| {
        Luma([if mask.get(x as i64, y as i64) { 255 } else { 0 }])
    })
}

/// Run the full pipeline on an RGB image.
pub fn detect_truss<F, S>(
    img: &RgbImage,
    detector: &TrussDetector,
    filter: &F,
    skeletonizer: &S,
    scale: Option<PixelScale>,
) -> Result<TrussDetection, TrussError>
where
    F: MaskFilter + ?Sized,
    S: Skeletonizer + ?Sized,
{
    let planes = color_planes(img)?;
    detector.process(&planes, filter, skeletonizer, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn primary_hues() {
        assert_abs_diff_eq!(hue_deg([255, 0, 0]), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(hue_deg([0, 255, 0]), 120.0, epsilon = 1e-3);
        assert_abs_diff_eq!(hue_deg([0, 0, 255]), 240.0, epsilon = 1e-3);
        assert_abs_diff_eq!(hue_deg([255, 0, 128]), 330.0, epsilon = 0.5);
        assert_abs_diff_eq!(hue_deg([90, 90, 90]), 0.0, epsilon = 1e-3);
        // stem green and background blue of the synthetic test images
        assert_abs_diff_eq!(hue_deg([60, 140, 50]), 113.33, epsilon = 0.05);
        assert_abs_diff_eq!(hue_deg([90, 100, 140]), 228.0, epsilon = 0.05);
    }

    #[test]
    fn saturation_scale() {
        assert_abs_diff_eq!(saturation_u8([255, 0, 0]), 255.0, epsilon = 1e-3);
        assert_abs_diff_eq!(saturation_u8([100, 100, 100]), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(saturation_u8([0, 0, 0]), 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(saturation_u8([60, 140, 50]), 255.0 * 90.0 / 140.0, epsilon = 0.05);
    }

    #[test]
    fn lab_a_separates_red_from_green() {
        assert!(lab_a([200, 30, 30]) > 40.0);
        assert!(lab_a([40, 160, 40]) < -30.0);
        assert_abs_diff_eq!(lab_a([128, 128, 128]), 0.0, epsilon = 0.1);
    }

    #[test]
    fn planes_have_image_shape() {
        let img = RgbImage::from_pixel(5, 3, image::Rgb([200, 20, 20]));
        let planes = color_planes(&img).unwrap();
        assert_eq!((planes.width(), planes.height()), (5, 3));
        assert!(planes.chroma().is_some());
        assert!(planes.saturation().is_some());
        assert_abs_diff_eq!(planes.hue()[0], 0.0);
    }
}
