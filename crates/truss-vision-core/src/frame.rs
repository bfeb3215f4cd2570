use std::fmt;

use nalgebra::{Point2, Rotation2, Vector2};
use serde::{Deserialize, Serialize};

/// The two coordinate frames a point can be expressed in.
///
/// `Original` is the unmodified input image; `Local` is the rotated and
/// cropped working image every detector operates on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frame {
    Original,
    Local,
}

impl Frame {
    pub fn name(self) -> &'static str {
        match self {
            Frame::Original => "original",
            Frame::Local => "local",
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A 2D pixel coordinate tagged with its frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub frame: Frame,
    pub coord: Point2<f32>,
}

impl Point2D {
    pub fn new(frame: Frame, x: f32, y: f32) -> Self {
        Self {
            frame,
            coord: Point2::new(x, y),
        }
    }

    pub fn local(x: f32, y: f32) -> Self {
        Self::new(Frame::Local, x, y)
    }

    pub fn original(x: f32, y: f32) -> Self {
        Self::new(Frame::Original, x, y)
    }

    /// Euclidean distance to a raw coordinate assumed to be in the same frame.
    #[inline]
    pub fn distance(&self, other: Point2<f32>) -> f32 {
        (self.coord - other).norm()
    }
}

/// Ordered set of coordinates sharing one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSet {
    pub frame: Frame,
    pub coords: Vec<Point2<f32>>,
}

impl PointSet {
    pub fn new(frame: Frame, coords: Vec<Point2<f32>>) -> Self {
        Self { frame, coords }
    }

    pub fn empty(frame: Frame) -> Self {
        Self::new(frame, Vec::new())
    }

    /// Integer pixel positions `(x, y)` as a point set.
    pub fn from_pixels(frame: Frame, pixels: impl IntoIterator<Item = (usize, usize)>) -> Self {
        Self::new(
            frame,
            pixels
                .into_iter()
                .map(|(x, y)| Point2::new(x as f32, y as f32))
                .collect(),
        )
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Iterate as tagged points.
    pub fn iter(&self) -> impl Iterator<Item = Point2D> + '_ {
        let frame = self.frame;
        self.coords.iter().map(move |&coord| Point2D { frame, coord })
    }
}

/// Rigid transform between [`Frame::Original`] and [`Frame::Local`].
///
/// The local frame is the original frame rotated by `angle` (radians,
/// positive = counter-clockwise in the `x`/`y` axes of the image) and then
/// translated by `-translation` (the crop origin):
///
/// `p_local = R(angle) * p_original - translation`
///
/// Computation is carried out in `f64`; both directions are exact inverses up
/// to floating-point precision.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameTransform {
    angle: f64,
    translation: Vector2<f64>,
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl FrameTransform {
    pub fn identity() -> Self {
        Self {
            angle: 0.0,
            translation: Vector2::zeros(),
        }
    }

    pub fn new(angle: f32, translation: [f32; 2]) -> Self {
        Self {
            angle: angle as f64,
            translation: Vector2::new(translation[0] as f64, translation[1] as f64),
        }
    }

    /// Rotation angle in radians.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle as f32
    }

    /// Crop origin in rotated coordinates.
    #[inline]
    pub fn translation(&self) -> [f32; 2] {
        [self.translation.x as f32, self.translation.y as f32]
    }

    /// Map a raw coordinate from the original frame into the local frame.
    #[inline]
    pub fn map_to_local(&self, p: Point2<f32>) -> Point2<f32> {
        let v = Rotation2::new(self.angle) * Vector2::new(p.x as f64, p.y as f64)
            - self.translation;
        Point2::new(v.x as f32, v.y as f32)
    }

    /// Map a raw coordinate from the local frame into the original frame.
    #[inline]
    pub fn map_to_original(&self, q: Point2<f32>) -> Point2<f32> {
        let v = Rotation2::new(-self.angle)
            * (Vector2::new(q.x as f64, q.y as f64) + self.translation);
        Point2::new(v.x as f32, v.y as f32)
    }

    /// Express `p` in the local frame. Local points are returned unchanged.
    pub fn to_local(&self, p: &Point2D) -> Point2D {
        match p.frame {
            Frame::Local => *p,
            Frame::Original => Point2D {
                frame: Frame::Local,
                coord: self.map_to_local(p.coord),
            },
        }
    }

    /// Express `p` in the original frame. Original points are returned unchanged.
    pub fn to_original(&self, p: &Point2D) -> Point2D {
        match p.frame {
            Frame::Original => *p,
            Frame::Local => Point2D {
                frame: Frame::Original,
                coord: self.map_to_original(p.coord),
            },
        }
    }

    pub fn express(&self, p: &Point2D, target: Frame) -> Point2D {
        match target {
            Frame::Local => self.to_local(p),
            Frame::Original => self.to_original(p),
        }
    }

    /// Convert every point of `set` into `target`, preserving order.
    pub fn express_set(&self, set: &PointSet, target: Frame) -> PointSet {
        let coords = match (set.frame, target) {
            (Frame::Original, Frame::Local) => {
                set.coords.iter().map(|&p| self.map_to_local(p)).collect()
            }
            (Frame::Local, Frame::Original) => set
                .coords
                .iter()
                .map(|&p| self.map_to_original(p))
                .collect(),
            _ => set.coords.clone(),
        };
        PointSet::new(target, coords)
    }

    /// Orientation measured in the local frame, expressed in the original frame.
    #[inline]
    pub fn angle_to_original(&self, angle_local: f32) -> f32 {
        -self.angle() + angle_local
    }

    /// Orientation measured in the original frame, expressed in the local frame.
    #[inline]
    pub fn angle_to_local(&self, angle_original: f32) -> f32 {
        angle_original + self.angle()
    }
}
