/// Row-major boolean image, `data.len() == width * height`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryMask {
    pub width: usize,
    pub height: usize,
    pub data: Vec<bool>,
}

impl BinaryMask {
    /// All-false mask.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, false)
    }

    pub fn filled(width: usize, height: usize, value: bool) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an existing buffer; `None` if the length does not match.
    pub fn from_raw(width: usize, height: usize, data: Vec<bool>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn same_shape(&self, other: &BinaryMask) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Pixel value; out-of-bounds reads are `false`.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.data[y as usize * self.width + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.width + x] = value;
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// `true` when no pixel is set.
    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    pub fn complement(&self) -> BinaryMask {
        BinaryMask {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| !v).collect(),
        }
    }

    /// Pixel-wise OR. Both masks must have the same shape.
    pub fn union(&self, other: &BinaryMask) -> BinaryMask {
        assert!(self.same_shape(other), "mask shapes differ");
        BinaryMask {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| a || b)
                .collect(),
        }
    }

    /// Number of pixels set in both masks.
    pub fn overlap_count(&self, other: &BinaryMask) -> usize {
        assert!(self.same_shape(other), "mask shapes differ");
        self.data
            .iter()
            .zip(&other.data)
            .filter(|(&a, &b)| a && b)
            .count()
    }

    pub fn is_disjoint(&self, other: &BinaryMask) -> bool {
        self.overlap_count(other) == 0
    }

    /// Coordinates `(x, y)` of set pixels in row-major order.
    pub fn iter_set(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let w = self.width.max(1);
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &v)| v)
            .map(move |(idx, _)| (idx % w, idx / w))
    }

    /// Inclusive bounding box `[min_x, min_y, max_x, max_y]` of set pixels.
    pub fn bounding_box(&self) -> Option<[usize; 4]> {
        let mut bbox: Option<[usize; 4]> = None;
        for (x, y) in self.iter_set() {
            let b = bbox.get_or_insert([x, y, x, y]);
            b[0] = b[0].min(x);
            b[1] = b[1].min(y);
            b[2] = b[2].max(x);
            b[3] = b[3].max(y);
        }
        bbox
    }

    /// Set every pixel within `radius` of `(cx, cy)` to `value`, clipped to
    /// the image. Returns the number of pixels whose value changed.
    pub fn fill_disk(&mut self, cx: i64, cy: i64, radius: i64, value: bool) -> usize {
        if radius < 0 {
            return 0;
        }
        let r2 = radius * radius;
        let x0 = (cx - radius).max(0);
        let x1 = (cx + radius).min(self.width as i64 - 1);
        let y0 = (cy - radius).max(0);
        let y1 = (cy + radius).min(self.height as i64 - 1);

        let mut changed = 0usize;
        for y in y0..=y1 {
            let dy = y - cy;
            for x in x0..=x1 {
                let dx = x - cx;
                if dx * dx + dy * dy > r2 {
                    continue;
                }
                let idx = y as usize * self.width + x as usize;
                if self.data[idx] != value {
                    self.data[idx] = value;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// 0 / 255 grayscale buffer, row-major.
    pub fn to_gray_u8(&self) -> Vec<u8> {
        self.data.iter().map(|&v| if v { 255 } else { 0 }).collect()
    }
}
