use crate::SegmentError;

/// Same-shape colour planes, row-major.
///
/// `hue` is always present; `chroma` (Lab a*) and `saturation` are optional
/// auxiliary channels in arbitrary linear units.
#[derive(Clone, Debug)]
pub struct ColorPlanes {
    width: usize,
    height: usize,
    hue: Vec<f32>,
    chroma: Option<Vec<f32>>,
    saturation: Option<Vec<f32>>,
}

impl ColorPlanes {
    /// Hue-only planes.
    pub fn new(width: usize, height: usize, hue: Vec<f32>) -> Result<Self, SegmentError> {
        check_len("hue", width, height, hue.len())?;
        Ok(Self {
            width,
            height,
            hue,
            chroma: None,
            saturation: None,
        })
    }

    pub fn with_chroma(mut self, chroma: Vec<f32>) -> Result<Self, SegmentError> {
        check_len("chroma", self.width, self.height, chroma.len())?;
        self.chroma = Some(chroma);
        Ok(self)
    }

    pub fn with_saturation(mut self, saturation: Vec<f32>) -> Result<Self, SegmentError> {
        check_len("saturation", self.width, self.height, saturation.len())?;
        self.saturation = Some(saturation);
        Ok(self)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hue.is_empty()
    }

    pub fn hue(&self) -> &[f32] {
        &self.hue
    }

    pub fn chroma(&self) -> Option<&[f32]> {
        self.chroma.as_deref()
    }

    pub fn saturation(&self) -> Option<&[f32]> {
        self.saturation.as_deref()
    }
}

fn check_len(plane: &'static str, width: usize, height: usize, len: usize) -> Result<(), SegmentError> {
    if len != width * height {
        return Err(SegmentError::PlaneSizeMismatch {
            plane,
            expected: width * height,
            actual: len,
        });
    }
    Ok(())
}

/// Min–max normalize a plane into `[-1, 1]`. A constant plane maps to 0.
pub(crate) fn normalize_plane(values: &[f32]) -> Vec<f32> {
    let (lo, hi) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = hi - lo;
    if !span.is_finite() || span <= f32::EPSILON {
        return vec![0.0; values.len()];
    }
    values.iter().map(|&v| (v - lo) / span * 2.0 - 1.0).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mismatched_plane_is_rejected() {
        let planes = ColorPlanes::new(3, 2, vec![0.0; 6]).unwrap();
        let err = planes.with_chroma(vec![0.0; 5]).unwrap_err();
        assert!(matches!(
            err,
            SegmentError::PlaneSizeMismatch {
                plane: "chroma",
                expected: 6,
                actual: 5
            }
        ));
        assert!(ColorPlanes::new(2, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn normalization_spans_minus_one_to_one() {
        let n = normalize_plane(&[10.0, 20.0, 15.0, 30.0]);
        assert_abs_diff_eq!(n[0], -1.0);
        assert_abs_diff_eq!(n[3], 1.0);
        assert_abs_diff_eq!(n[1], 0.0, epsilon = 1e-6);
        assert_eq!(normalize_plane(&[4.0; 5]), vec![0.0; 5]);
        assert!(normalize_plane(&[]).is_empty());
    }
}
