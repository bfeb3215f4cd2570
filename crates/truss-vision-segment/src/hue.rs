//! Circular hue arithmetic.
//!
//! All angles here are in degrees on the full hue circle `[0, 360)`.

use serde::{Deserialize, Serialize};

/// Encoding of the hue plane handed to the segmenter.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HueScale {
    /// Full circle, `[0, 360)`.
    #[default]
    Degrees,
    /// 8-bit HSV convention, `[0, 180)`; doubled onto the full circle.
    HalfDegrees,
}

impl HueScale {
    /// Multiplier that brings a raw hue value onto the full circle.
    #[inline]
    pub fn factor(self) -> f32 {
        match self {
            HueScale::Degrees => 1.0,
            HueScale::HalfDegrees => 2.0,
        }
    }

    /// Raw hue value expressed in degrees `[0, 360)`.
    #[inline]
    pub fn to_degrees(self, raw: f32) -> f32 {
        wrap_deg(raw * self.factor())
    }
}

/// Wrap an angle to `[0, 360)`.
#[inline]
pub fn wrap_deg(a: f32) -> f32 {
    let w = a.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if w >= 360.0 {
        0.0
    } else {
        w
    }
}

/// Shortest distance between two hues on the circle, in `[0, 180]`.
#[inline]
pub fn angular_distance_deg(a: f32, b: f32) -> f32 {
    let d = wrap_deg(a - b);
    d.min(360.0 - d)
}

/// Hue angle of a point on the hue plane, in `[0, 360)`.
#[inline]
pub fn hue_from_xy(x: f32, y: f32) -> f32 {
    wrap_deg(y.atan2(x).to_degrees())
}

/// Point on the hue circle of the given radius.
#[inline]
pub fn hue_to_xy(hue_deg: f32, radius: f32) -> (f32, f32) {
    let (s, c) = hue_deg.to_radians().sin_cos();
    (radius * c, radius * s)
}
