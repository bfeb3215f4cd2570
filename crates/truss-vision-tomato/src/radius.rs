use serde::{Deserialize, Serialize};

/// Physical size category of the fruit on a truss.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TomatoSize {
    #[default]
    Small,
    Big,
}

/// Known image scale of a measurement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelScale {
    pub px_per_mm: f32,
    pub size: TomatoSize,
}

/// Radius interval in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MmRange {
    pub min_mm: f32,
    pub max_mm: f32,
}

/// Rules for deriving the circle radius interval.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusParams {
    pub small: MmRange,
    pub big: MmRange,
    /// Without a scale: `min = width / radius_min_frac`.
    pub radius_min_frac: f32,
    /// Without a scale: `max = width / radius_max_frac`.
    pub radius_max_frac: f32,
}

impl Default for RadiusParams {
    fn default() -> Self {
        Self {
            small: MmRange {
                min_mm: 15.0,
                max_mm: 25.0,
            },
            big: MmRange {
                min_mm: 25.0,
                max_mm: 40.0,
            },
            radius_min_frac: 8.0,
            radius_max_frac: 4.0,
        }
    }
}

/// Inclusive radius interval in pixels.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RadiusBounds {
    pub min_px: u32,
    pub max_px: u32,
}

impl RadiusBounds {
    pub fn new(min_px: u32, max_px: u32) -> Self {
        let min_px = min_px.max(1);
        Self {
            min_px,
            max_px: max_px.max(min_px),
        }
    }

    /// Smallest allowed distance between two circle centers.
    #[inline]
    pub fn min_center_distance(&self) -> f32 {
        2.0 * self.min_px as f32
    }

    /// Bounds from a pixel scale and size category, or from the image width
    /// when the scale is unknown.
    pub fn resolve(params: &RadiusParams, image_width: usize, scale: Option<PixelScale>) -> Self {
        match scale {
            Some(s) => {
                let range = match s.size {
                    TomatoSize::Small => params.small,
                    TomatoSize::Big => params.big,
                };
                Self::new(
                    (s.px_per_mm * range.min_mm).round() as u32,
                    (s.px_per_mm * range.max_mm).round() as u32,
                )
            }
            None => Self::new(
                (image_width as f32 / params.radius_min_frac).round() as u32,
                (image_width as f32 / params.radius_max_frac).round() as u32,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_from_scale_use_size_category() {
        let p = RadiusParams::default();
        let small = RadiusBounds::resolve(
            &p,
            1000,
            Some(PixelScale {
                px_per_mm: 2.0,
                size: TomatoSize::Small,
            }),
        );
        assert_eq!(small, RadiusBounds::new(30, 50));
        let big = RadiusBounds::resolve(
            &p,
            1000,
            Some(PixelScale {
                px_per_mm: 2.0,
                size: TomatoSize::Big,
            }),
        );
        assert_eq!(big, RadiusBounds::new(50, 80));
        assert_eq!(big.min_center_distance(), 100.0);
    }

    #[test]
    fn bounds_from_width_without_scale() {
        let b = RadiusBounds::resolve(&RadiusParams::default(), 400, None);
        assert_eq!(b, RadiusBounds::new(50, 100));
    }

    #[test]
    fn degenerate_bounds_are_repaired() {
        let b = RadiusBounds::new(0, 0);
        assert_eq!(b.min_px, 1);
        assert_eq!(b.max_px, 1);
    }
}
