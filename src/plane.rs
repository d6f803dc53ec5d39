//! Strided single-band access into an interleaved sample buffer.

use crate::raster::Rect;
use crate::sample::Sample;

/// View over one band of a source window.
///
/// Coordinates passed to the accessors are absolute image coordinates; the
/// plane subtracts its origin and applies the pixel and row strides.
#[derive(Copy, Clone, Debug)]
pub struct SamplePlane<'a, S> {
    data: &'a [S],
    base: usize,
    pixel_stride: usize,
    row_stride: usize,
    bounds: Rect,
}

impl<'a, S: Sample> SamplePlane<'a, S> {
    pub fn new(
        data: &'a [S],
        base: usize,
        pixel_stride: usize,
        row_stride: usize,
        bounds: Rect,
    ) -> Self {
        debug_assert!(pixel_stride > 0);
        debug_assert!(
            bounds.is_empty()
                || base + (bounds.height - 1) * row_stride + (bounds.width - 1) * pixel_stride
                    < data.len(),
            "plane extends past its buffer"
        );
        Self {
            data,
            base,
            pixel_stride,
            row_stride,
            bounds,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        self.bounds.contains(x, y)
    }

    #[inline(always)]
    fn index(&self, x: i64, y: i64) -> usize {
        debug_assert!(self.bounds.contains(x, y), "tap ({x}, {y}) outside plane");
        self.base
            + (y - self.bounds.y) as usize * self.row_stride
            + (x - self.bounds.x) as usize * self.pixel_stride
    }

    /// Sample at absolute `(x, y)`. The caller guarantees the position lies
    /// inside the plane (scanline clipping establishes this for every tap).
    #[inline(always)]
    pub fn get(&self, x: i64, y: i64) -> S {
        self.data[self.index(x, y)]
    }

    /// Four horizontally adjacent samples starting at `(x, y)`.
    #[inline(always)]
    pub fn row4(&self, x: i64, y: i64) -> [S; 4] {
        let i = self.index(x, y);
        let s = self.pixel_stride;
        [
            self.data[i],
            self.data[i + s],
            self.data[i + 2 * s],
            self.data[i + 3 * s],
        ]
    }

    /// Two horizontally adjacent samples starting at `(x, y)`.
    #[inline(always)]
    pub fn row2(&self, x: i64, y: i64) -> [S; 2] {
        let i = self.index(x, y);
        [self.data[i], self.data[i + self.pixel_stride]]
    }
}
