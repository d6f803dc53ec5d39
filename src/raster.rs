//! Raster buffers with band-interleaved, row-major storage.
//!
//! # Memory Layout
//!
//! Samples are stored in a flat buffer in row-major order:
//!
//! ```text
//! data[y * stride + x * bands + b]
//! ```
//!
//! where `stride = width * bands` and `(x, y)` are local to the raster. Every
//! raster also carries its placement in image space (`bounds`), so a tile of a
//! larger image keeps its absolute coordinates.

use std::cmp;

use crate::error::{Result, WarpError};
use crate::plane::SamplePlane;
use crate::sample::{Sample, SampleKind};

/// Integer rectangle in image space. `x`/`y` is the top-left pixel,
/// `max_x`/`max_y` are exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: usize,
    pub height: usize,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning `[x0, x1) x [y0, y1)`; empty if inverted.
    pub fn from_corners(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self {
            x: x0,
            y: y0,
            width: (x1 - x0).max(0) as usize,
            height: (y1 - y0).max(0) as usize,
        }
    }

    pub fn max_x(&self) -> i64 {
        self.x + self.width as i64
    }

    pub fn max_y(&self) -> i64 {
        self.y + self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x && y >= self.y && x < self.max_x() && y < self.max_y()
    }

    pub fn intersection(&self, other: &Rect) -> Rect {
        Rect::from_corners(
            self.x.max(other.x),
            self.y.max(other.y),
            self.max_x().min(other.max_x()),
            self.max_y().min(other.max_y()),
        )
    }

    /// Grows the rectangle by the given margins on each side.
    pub fn pad(&self, left: i64, top: i64, right: i64, bottom: i64) -> Rect {
        Rect::from_corners(
            self.x - left,
            self.y - top,
            self.max_x() + right,
            self.max_y() + bottom,
        )
    }

    /// Splits the rectangle into row-major tiles of at most `size` x `size`.
    pub fn tiles(&self, size: usize) -> impl Iterator<Item = Rect> + '_ {
        let size = size.max(1);
        (0..self.height).step_by(size).flat_map(move |ty| {
            (0..self.width).step_by(size).map(move |tx| {
                Rect::new(
                    self.x + tx as i64,
                    self.y + ty as i64,
                    cmp::min(size, self.width - tx),
                    cmp::min(size, self.height - ty),
                )
            })
        })
    }
}

/// A multi-band raster of one sample kind placed at `bounds` in image space.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster<S> {
    bounds: Rect,
    bands: usize,
    data: Vec<S>,
}

impl<S: Sample> Raster<S> {
    /// Creates a raster filled with `S::default()`.
    pub fn new(bounds: Rect, bands: usize) -> Self {
        let len = bounds
            .width
            .saturating_mul(bounds.height)
            .saturating_mul(bands);
        Self {
            bounds,
            bands,
            data: vec![S::default(); len],
        }
    }

    /// Creates a raster with every pixel set to `values`, broadcast per band.
    pub fn filled(bounds: Rect, bands: usize, values: &[S]) -> Self {
        let mut raster = Self::new(bounds, bands);
        raster.fill(values);
        raster
    }

    pub fn from_vec(bounds: Rect, bands: usize, data: Vec<S>) -> Result<Self> {
        let expected = bounds
            .width
            .checked_mul(bounds.height)
            .and_then(|v| v.checked_mul(bands))
            .ok_or(WarpError::SizeMismatch {
                expected: usize::MAX,
                actual: data.len(),
            })?;
        if data.len() != expected {
            return Err(WarpError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            bounds,
            bands,
            data,
        })
    }

    pub fn kind(&self) -> SampleKind {
        S::KIND
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn width(&self) -> usize {
        self.bounds.width
    }

    pub fn height(&self) -> usize {
        self.bounds.height
    }

    pub fn bands(&self) -> usize {
        self.bands
    }

    /// Row stride in samples (width * bands).
    pub fn stride(&self) -> usize {
        self.bounds.width * self.bands
    }

    pub fn data(&self) -> &[S] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [S] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<S> {
        self.data
    }

    /// Moves the raster to a new origin without touching its samples.
    pub fn set_origin(&mut self, x: i64, y: i64) {
        self.bounds.x = x;
        self.bounds.y = y;
    }

    /// Returns the samples for local row `y`.
    pub fn row(&self, y: usize) -> &[S] {
        let stride = self.stride();
        let start = y * stride;
        &self.data[start..start + stride]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [S] {
        let stride = self.stride();
        let start = y * stride;
        &mut self.data[start..start + stride]
    }

    /// Returns the samples for the pixel at local `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> &[S] {
        let start = y * self.stride() + x * self.bands;
        &self.data[start..start + self.bands]
    }

    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut [S] {
        let start = y * self.stride() + x * self.bands;
        let bands = self.bands;
        &mut self.data[start..start + bands]
    }

    /// Sample at absolute image coordinates, or `None` outside the bounds.
    pub fn get(&self, x: i64, y: i64, band: usize) -> Option<S> {
        if band >= self.bands || !self.bounds.contains(x, y) {
            return None;
        }
        let lx = (x - self.bounds.x) as usize;
        let ly = (y - self.bounds.y) as usize;
        Some(self.data[ly * self.stride() + lx * self.bands + band])
    }

    /// Fills all pixels with `values`; the last value repeats for extra bands.
    pub fn fill(&mut self, values: &[S]) {
        let bands = self.bands;
        if bands == 0 || values.is_empty() {
            return;
        }
        let pixel: Vec<S> = (0..bands)
            .map(|b| values[b.min(values.len() - 1)])
            .collect();
        for chunk in self.data.chunks_exact_mut(bands) {
            chunk.copy_from_slice(&pixel);
        }
    }

    /// Strided view over a single band.
    pub fn plane(&self, band: usize) -> SamplePlane<'_, S> {
        assert!(band < self.bands, "band index out of bounds");
        SamplePlane::new(
            &self.data,
            band,
            self.bands,
            self.stride(),
            self.bounds,
        )
    }

    /// Extracts the part of the raster inside `rect` (absolute coordinates).
    /// Returns an empty raster when they do not overlap.
    pub fn crop(&self, rect: Rect) -> Raster<S> {
        let clipped = self.bounds.intersection(&rect);
        if clipped.is_empty() {
            return Raster::new(Rect::new(rect.x, rect.y, 0, 0), self.bands);
        }
        if clipped == self.bounds {
            return self.clone();
        }

        let mut result = Raster::new(clipped, self.bands);
        let bands = self.bands;
        let in_stride = self.stride();
        let out_stride = result.stride();
        let left = (clipped.x - self.bounds.x) as usize;
        let top = (clipped.y - self.bounds.y) as usize;
        let mut in_index = top * in_stride + left * bands;
        let mut out_index = 0;
        let span = clipped.width * bands;

        for _ in 0..clipped.height {
            result.data[out_index..out_index + span]
                .copy_from_slice(&self.data[in_index..in_index + span]);
            in_index += in_stride;
            out_index += out_stride;
        }
        result
    }

    /// Copies `tile` into this raster where their bounds overlap.
    pub fn blit(&mut self, tile: &Raster<S>) {
        assert_eq!(self.bands, tile.bands, "band count mismatch");
        let overlap = self.bounds.intersection(&tile.bounds);
        if overlap.is_empty() {
            return;
        }
        let bands = self.bands;
        let span = overlap.width * bands;
        for y in overlap.y..overlap.max_y() {
            let src_start = (y - tile.bounds.y) as usize * tile.stride()
                + (overlap.x - tile.bounds.x) as usize * bands;
            let dst_start = (y - self.bounds.y) as usize * self.stride()
                + (overlap.x - self.bounds.x) as usize * bands;
            self.data[dst_start..dst_start + span]
                .copy_from_slice(&tile.data[src_start..src_start + span]);
        }
    }
}

/// A single-band 1-bit raster, packed most significant bit first with each
/// row starting on a byte boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitRaster {
    bounds: Rect,
    row_bytes: usize,
    data: Vec<u8>,
}

impl BitRaster {
    pub fn new(bounds: Rect) -> Self {
        let row_bytes = bounds.width.div_ceil(8);
        Self {
            bounds,
            row_bytes,
            data: vec![0; row_bytes * bounds.height],
        }
    }

    pub fn from_packed(bounds: Rect, data: Vec<u8>) -> Result<Self> {
        let row_bytes = bounds.width.div_ceil(8);
        let expected = row_bytes * bounds.height;
        if data.len() != expected {
            return Err(WarpError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            bounds,
            row_bytes,
            data,
        })
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn packed(&self) -> &[u8] {
        &self.data
    }

    /// Bit at absolute coordinates, `false` outside the bounds.
    pub fn get(&self, x: i64, y: i64) -> bool {
        if !self.bounds.contains(x, y) {
            return false;
        }
        let lx = (x - self.bounds.x) as usize;
        let ly = (y - self.bounds.y) as usize;
        self.data[ly * self.row_bytes + lx / 8] & (0x80 >> (lx % 8)) != 0
    }

    pub fn set(&mut self, x: i64, y: i64, value: bool) {
        if !self.bounds.contains(x, y) {
            return;
        }
        let lx = (x - self.bounds.x) as usize;
        let ly = (y - self.bounds.y) as usize;
        let byte = &mut self.data[ly * self.row_bytes + lx / 8];
        let mask = 0x80 >> (lx % 8);
        if value {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }

    /// Expands to one byte per pixel holding 0 or 1.
    pub fn unpack(&self) -> Raster<u8> {
        let mut out = Raster::new(self.bounds, 1);
        for ly in 0..self.bounds.height {
            let packed = &self.data[ly * self.row_bytes..(ly + 1) * self.row_bytes];
            for (lx, dst) in out.row_mut(ly).iter_mut().enumerate() {
                *dst = (packed[lx / 8] >> (7 - lx % 8)) & 1;
            }
        }
        out
    }

    /// Packs a byte raster; any non-zero sample becomes a set bit.
    pub fn pack(raster: &Raster<u8>) -> Self {
        let mut out = BitRaster::new(raster.bounds());
        for ly in 0..raster.height() {
            let row = raster.row(ly);
            let packed = &mut out.data[ly * out.row_bytes..(ly + 1) * out.row_bytes];
            for (lx, &v) in row.iter().step_by(raster.bands().max(1)).enumerate() {
                if v != 0 {
                    packed[lx / 8] |= 0x80 >> (lx % 8);
                }
            }
        }
        out
    }
}

/// A raster whose sample kind is only known at runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum RasterBuffer {
    Bit(BitRaster),
    Byte(Raster<u8>),
    Short(Raster<i16>),
    UShort(Raster<u16>),
    Int(Raster<i32>),
    Float(Raster<f32>),
    Double(Raster<f64>),
}

impl RasterBuffer {
    /// Allocates a zeroed buffer of the given kind.
    pub fn new(kind: SampleKind, bounds: Rect, bands: usize) -> Self {
        match kind {
            SampleKind::Bit => RasterBuffer::Bit(BitRaster::new(bounds)),
            SampleKind::Byte => RasterBuffer::Byte(Raster::new(bounds, bands)),
            SampleKind::Short => RasterBuffer::Short(Raster::new(bounds, bands)),
            SampleKind::UShort => RasterBuffer::UShort(Raster::new(bounds, bands)),
            SampleKind::Int => RasterBuffer::Int(Raster::new(bounds, bands)),
            SampleKind::Float => RasterBuffer::Float(Raster::new(bounds, bands)),
            SampleKind::Double => RasterBuffer::Double(Raster::new(bounds, bands)),
        }
    }

    pub fn kind(&self) -> SampleKind {
        match self {
            RasterBuffer::Bit(_) => SampleKind::Bit,
            RasterBuffer::Byte(_) => SampleKind::Byte,
            RasterBuffer::Short(_) => SampleKind::Short,
            RasterBuffer::UShort(_) => SampleKind::UShort,
            RasterBuffer::Int(_) => SampleKind::Int,
            RasterBuffer::Float(_) => SampleKind::Float,
            RasterBuffer::Double(_) => SampleKind::Double,
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            RasterBuffer::Bit(r) => r.bounds(),
            RasterBuffer::Byte(r) => r.bounds(),
            RasterBuffer::Short(r) => r.bounds(),
            RasterBuffer::UShort(r) => r.bounds(),
            RasterBuffer::Int(r) => r.bounds(),
            RasterBuffer::Float(r) => r.bounds(),
            RasterBuffer::Double(r) => r.bounds(),
        }
    }

    pub fn bands(&self) -> usize {
        match self {
            RasterBuffer::Bit(_) => 1,
            RasterBuffer::Byte(r) => r.bands(),
            RasterBuffer::Short(r) => r.bands(),
            RasterBuffer::UShort(r) => r.bands(),
            RasterBuffer::Int(r) => r.bands(),
            RasterBuffer::Float(r) => r.bands(),
            RasterBuffer::Double(r) => r.bands(),
        }
    }
}

impl From<BitRaster> for RasterBuffer {
    fn from(raster: BitRaster) -> Self {
        RasterBuffer::Bit(raster)
    }
}

macro_rules! impl_from_raster {
    ($t:ty, $variant:ident) => {
        impl From<Raster<$t>> for RasterBuffer {
            fn from(raster: Raster<$t>) -> Self {
                RasterBuffer::$variant(raster)
            }
        }
    };
}

impl_from_raster!(u8, Byte);
impl_from_raster!(i16, Short);
impl_from_raster!(u16, UShort);
impl_from_raster!(i32, Int);
impl_from_raster!(f32, Float);
impl_from_raster!(f64, Double);
