//! Affine warp of multi-band rasters with ROI and no-data awareness.
//!
//! # Algorithm Overview
//!
//! 1. **Setup**: The affine map is inverted once when the operator is built.
//!    Kernel tables and the masking case are fixed at the same time, so tile
//!    computation never fails.
//!
//! 2. **Scanline clipping**: Each destination row is cut into anchor runs.
//!    For each run, the range of columns whose kernel support lies inside the
//!    source window is found in closed form from the fixed-point walk.
//!    Columns outside it receive the destination no-data value (or keep the
//!    background when filling is disabled).
//!
//! 3. **Fixed-point walk**: Inside the clipped range, source positions advance
//!    by an exact fixed-point step per column from the run's back-projected
//!    anchor.
//!
//! 4. **Masking case**: One of four classifiers is chosen per tile (unmasked,
//!    ROI only, no-data only, both). The unmasked path performs no per-tap
//!    tests at all.
//!
//! 5. **Interpolation**: Nearest, bilinear or bicubic reconstruction per band,
//!    with inpainting of invalid bicubic taps, followed by the per-kind clamp.
//!
//! Whole images are processed in 64x64 tiles (`K_TILE`) by [`OpAffineWarp::apply`].

use log::{debug, trace};

use crate::affine::AffineMap;
use crate::error::{Result, WarpError};
use crate::interp::{Interpolation, Kernel};
use crate::raster::{BitRaster, Raster, RasterBuffer, Rect};
use crate::sample::Sample;
use crate::validity::{
    AllValid, MaskCase, NoDataClassifier, NoDataRange, Roi, RoiClassifier, RoiNoDataClassifier,
    TapClassifier,
};
use crate::walker::{ANCHOR_SPAN, FRAC_BITS, GeometryWalker, anchor_runs};

/// Tile size used by [`OpAffineWarp::apply`].
pub const K_TILE: usize = 64;

/// Largest supported fixed-point precision for bicubic weights.
pub const MAX_PRECISION_BITS: u32 = 24;

/// Parameters of an affine warp.
///
/// Setters follow the builder style and return `&mut Self`; the configuration
/// is validated once by [`OpAffineWarp::new`].
#[derive(Clone, Debug, PartialEq)]
pub struct WarpConfig {
    interpolation: Interpolation,
    subsample_bits: u32,
    precision_bits: u32,
    cubic_a: f64,
    roi: Option<Roi>,
    no_data_range: Option<NoDataRange>,
    destination_no_data: Vec<f64>,
    background: Vec<f64>,
    fill_no_data: bool,
}

impl Default for WarpConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WarpConfig {
    pub fn new() -> Self {
        Self {
            interpolation: Interpolation::Nearest,
            subsample_bits: 8,
            precision_bits: 8,
            cubic_a: -0.5,
            roi: None,
            no_data_range: None,
            destination_no_data: vec![0.0],
            background: vec![0.0],
            fill_no_data: true,
        }
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) -> &mut Self {
        self.interpolation = interpolation;
        self
    }

    /// Sub-pixel phase resolution for integer kinds, as a power of two.
    pub fn set_subsample_bits(&mut self, bits: u32) -> &mut Self {
        self.subsample_bits = bits;
        self
    }

    /// Fixed-point precision of tabulated bicubic weights.
    pub fn set_precision_bits(&mut self, bits: u32) -> &mut Self {
        self.precision_bits = bits;
        self
    }

    /// Cubic convolution parameter `a`.
    pub fn set_cubic_parameter(&mut self, a: f64) -> &mut Self {
        self.cubic_a = a;
        self
    }

    pub fn set_roi(&mut self, roi: Option<Roi>) -> &mut Self {
        self.roi = roi;
        self
    }

    pub fn set_no_data_range(&mut self, range: Option<NoDataRange>) -> &mut Self {
        self.no_data_range = range;
        self
    }

    /// Value written where no source data is usable, one per band. The last
    /// value repeats for any further bands.
    pub fn set_destination_no_data(&mut self, values: &[f64]) -> &mut Self {
        self.destination_no_data = values.to_vec();
        self
    }

    /// Initial value of destination rasters allocated by `apply`, broadcast
    /// like the destination no-data values.
    pub fn set_background(&mut self, values: &[f64]) -> &mut Self {
        self.background = values.to_vec();
        self
    }

    /// When false, unusable destination pixels keep their previous contents.
    pub fn set_fill_no_data(&mut self, fill: bool) -> &mut Self {
        self.fill_no_data = fill;
        self
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn subsample_bits(&self) -> u32 {
        self.subsample_bits
    }

    pub fn precision_bits(&self) -> u32 {
        self.precision_bits
    }

    pub fn cubic_parameter(&self) -> f64 {
        self.cubic_a
    }

    pub fn roi(&self) -> Option<&Roi> {
        self.roi.as_ref()
    }

    pub fn no_data_range(&self) -> Option<&NoDataRange> {
        self.no_data_range.as_ref()
    }

    pub fn destination_no_data(&self) -> &[f64] {
        &self.destination_no_data
    }

    pub fn background(&self) -> &[f64] {
        &self.background
    }

    pub fn fill_no_data(&self) -> bool {
        self.fill_no_data
    }

    pub fn mask_case(&self) -> MaskCase {
        MaskCase::new(self.roi.is_some(), self.no_data_range.is_some())
    }

    fn validate(&self) -> Result<()> {
        if !(1..=FRAC_BITS).contains(&self.subsample_bits) {
            return Err(WarpError::InvalidParameter(format!(
                "subsample bits must be in 1..={FRAC_BITS}, got {}",
                self.subsample_bits
            )));
        }
        if !(1..=MAX_PRECISION_BITS).contains(&self.precision_bits) {
            return Err(WarpError::InvalidParameter(format!(
                "precision bits must be in 1..={MAX_PRECISION_BITS}, got {}",
                self.precision_bits
            )));
        }
        if !self.cubic_a.is_finite() {
            return Err(WarpError::InvalidParameter(format!(
                "cubic parameter must be finite, got {}",
                self.cubic_a
            )));
        }
        if self.destination_no_data.is_empty() {
            return Err(WarpError::InvalidParameter(
                "destination no-data needs at least one value".into(),
            ));
        }
        if self.background.is_empty() {
            return Err(WarpError::InvalidParameter(
                "background needs at least one value".into(),
            ));
        }
        Ok(())
    }
}

/// Reusable per-tile buffers.
///
/// Holds the clipped column range of every anchor run of every destination
/// row. Keeping one per worker avoids reallocating it for each tile.
#[derive(Clone, Debug, Default)]
pub struct WarpScratch {
    run_start: Vec<usize>,
    run_end: Vec<usize>,
}

impl WarpScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes room for `runs` anchor runs without reallocating.
    pub fn reserve(&mut self, runs: usize) {
        if self.run_start.len() < runs {
            self.run_start.resize(runs, 0);
            self.run_end.resize(runs, 0);
        }
    }

    fn prepare(&mut self, runs: usize) {
        self.reserve(runs);
        self.run_start[..runs].fill(0);
        self.run_end[..runs].fill(0);
    }
}

/// Resamples rasters under an affine transform.
///
/// The operator is immutable once built and can be shared between threads;
/// each worker computes disjoint destination tiles with its own
/// [`WarpScratch`].
#[derive(Clone, Debug)]
pub struct OpAffineWarp {
    map: AffineMap,
    config: WarpConfig,
    kernel: Kernel,
    walker: GeometryWalker,
}

impl OpAffineWarp {
    pub fn new(map: AffineMap, config: WarpConfig) -> Result<Self> {
        config.validate()?;
        let interpolation = config.interpolation;
        let kernel = Kernel::new(
            interpolation,
            config.subsample_bits,
            config.precision_bits,
            config.cubic_a,
        );
        let walker = GeometryWalker::new(&map, interpolation.origin_shift());
        debug!(
            "affine warp: forward={:?} inverse={:?} kernel={} mask={:?} fill_no_data={}",
            map.forward(),
            map.inverse(),
            interpolation,
            config.mask_case(),
            config.fill_no_data
        );
        Ok(Self {
            map,
            config,
            kernel,
            walker,
        })
    }

    /// Builds the operator from a forward matrix
    /// `[m00, m01, m02, m10, m11, m12]`.
    pub fn from_matrix(matrix: [f64; 6], config: WarpConfig) -> Result<Self> {
        Self::new(AffineMap::new(matrix)?, config)
    }

    pub fn map(&self) -> &AffineMap {
        &self.map
    }

    pub fn config(&self) -> &WarpConfig {
        &self.config
    }

    pub fn interpolation(&self) -> Interpolation {
        self.kernel.interpolation()
    }

    pub fn mask_case(&self) -> MaskCase {
        self.config.mask_case()
    }

    /// Destination rectangle covered by a warped source rectangle.
    pub fn destination_bounds(&self, src: Rect) -> Rect {
        self.map.map_bounds(src)
    }

    /// Source window needed to compute the destination tile `dst`, including
    /// the kernel's padding.
    pub fn source_footprint(&self, dst: Rect) -> Rect {
        let (before, after) = self.interpolation().padding();
        self.map
            .inverse_map_bounds(dst)
            .pad(before + 1, before + 1, after + 1, after + 1)
    }

    /// Warps `src` into a new raster covering `dst_rect`.
    ///
    /// The result starts out filled with the configured background and is
    /// painted in `K_TILE` x `K_TILE` tiles.
    pub fn apply<S: Sample>(&self, src: &Raster<S>, dst_rect: Rect) -> Raster<S> {
        let background = broadcast::<S>(&self.config.background, src.bands());
        let mut dst = Raster::filled(dst_rect, src.bands(), &background);
        self.apply_to_preallocated(src, &mut dst);
        dst
    }

    /// Paints every tile of `dst` in place.
    pub fn apply_to_preallocated<S: Sample>(&self, src: &Raster<S>, dst: &mut Raster<S>) {
        let mut scratch = WarpScratch::new();
        scratch.reserve(K_TILE * (K_TILE / ANCHOR_SPAN + 1));
        for tile_rect in dst.bounds().tiles(K_TILE) {
            self.paint_region(src, dst, tile_rect, &mut scratch);
        }
    }

    /// Paints the destination tile `dst` from the source window `src`.
    ///
    /// `src` must cover [`source_footprint`](Self::source_footprint) of the
    /// tile for every destination pixel to be computed; pixels whose kernel
    /// falls outside `src` are treated as out of support.
    pub fn compute_tile<S: Sample>(&self, src: &Raster<S>, dst: &mut Raster<S>) {
        let mut scratch = WarpScratch::new();
        self.compute_tile_with_scratch(src, dst, &mut scratch);
    }

    pub fn compute_tile_with_scratch<S: Sample>(
        &self,
        src: &Raster<S>,
        dst: &mut Raster<S>,
        scratch: &mut WarpScratch,
    ) {
        let bounds = dst.bounds();
        self.paint_region(src, dst, bounds, scratch);
    }

    /// Paints the part of `dst` inside `region`, leaving the rest untouched.
    fn paint_region<S: Sample>(
        &self,
        src: &Raster<S>,
        dst: &mut Raster<S>,
        region: Rect,
        scratch: &mut WarpScratch,
    ) {
        assert_eq!(
            src.bands(),
            dst.bands(),
            "source and destination band counts differ"
        );
        let region = region.intersection(&dst.bounds());
        if region.is_empty() || dst.bands() == 0 {
            return;
        }

        let support = self.interpolation().anchor_support(src.bounds());
        let runs_per_row = anchor_runs(region.x, region.width).count();
        scratch.prepare(region.height * runs_per_row);
        let mut clipped_runs = 0;
        for row in 0..region.height {
            let dst_y = region.y + row as i64;
            for (i, run) in anchor_runs(region.x, region.width).enumerate() {
                let start = self.walker.row(region.x + run.start as i64, dst_y).pos();
                if let Some(span) = self.walker.clip(start, run.len(), support) {
                    let slot = row * runs_per_row + i;
                    scratch.run_start[slot] = span.start;
                    scratch.run_end[slot] = span.end;
                    clipped_runs += 1;
                }
            }
        }
        trace!(
            "warp tile {:?}: {} of {} runs intersect source support {:?}",
            region,
            clipped_runs,
            region.height * runs_per_row,
            support
        );

        let no_data = broadcast::<S>(&self.config.destination_no_data, dst.bands());
        match (&self.config.roi, &self.config.no_data_range) {
            (None, None) => self.paint(src, dst, region, scratch, &AllValid, &no_data),
            (Some(roi), None) => {
                self.paint(src, dst, region, scratch, &RoiClassifier { roi }, &no_data)
            }
            (None, Some(range)) => {
                self.paint(src, dst, region, scratch, &NoDataClassifier { range }, &no_data)
            }
            (Some(roi), Some(range)) => self.paint(
                src,
                dst,
                region,
                scratch,
                &RoiNoDataClassifier { roi, range },
                &no_data,
            ),
        }
    }

    fn paint<S: Sample, C: TapClassifier>(
        &self,
        src: &Raster<S>,
        dst: &mut Raster<S>,
        region: Rect,
        scratch: &WarpScratch,
        classifier: &C,
        no_data: &[S],
    ) {
        let bands = dst.bands();
        let fill = self.config.fill_no_data;
        let planes: Vec<_> = (0..bands).map(|b| src.plane(b)).collect();
        let first_column = (region.x - dst.bounds().x) as usize;
        let first_row = (region.y - dst.bounds().y) as usize;
        let runs_per_row = anchor_runs(region.x, region.width).count();

        for row in 0..region.height {
            let dst_y = region.y + row as i64;
            let columns = first_column * bands..(first_column + region.width) * bands;
            let dst_row = &mut dst.row_mut(first_row + row)[columns];
            for (i, run) in anchor_runs(region.x, region.width).enumerate() {
                let slot = row * runs_per_row + i;
                let span = scratch.run_start[slot]..scratch.run_end[slot];
                let run_pixels = &mut dst_row[run.start * bands..run.end * bands];
                let (head, rest) = run_pixels.split_at_mut(span.start * bands);
                let (body, tail) = rest.split_at_mut(span.len() * bands);
                if fill {
                    for pixel in head
                        .chunks_exact_mut(bands)
                        .chain(tail.chunks_exact_mut(bands))
                    {
                        pixel.copy_from_slice(no_data);
                    }
                }
                if body.is_empty() {
                    continue;
                }

                let mut cursor = self
                    .walker
                    .row(region.x + (run.start + span.start) as i64, dst_y);
                for pixel in body.chunks_exact_mut(bands) {
                    let pos = cursor.pos();
                    for (band, plane) in planes.iter().enumerate() {
                        match self.kernel.sample(plane, classifier, pos) {
                            Some(value) => pixel[band] = value,
                            None if fill => pixel[band] = no_data[band],
                            None => {}
                        }
                    }
                    cursor.advance();
                }
            }
        }
    }

    /// Runtime-typed tile computation.
    ///
    /// Source and destination must share a kind and band count. Bit rasters
    /// are interpolated as bytes and repacked; any non-zero result sets the
    /// bit.
    pub fn compute_tile_dyn(&self, src: &RasterBuffer, dst: &mut RasterBuffer) -> Result<()> {
        if src.kind() != dst.kind() {
            return Err(WarpError::KindMismatch {
                src_kind: src.kind(),
                dst_kind: dst.kind(),
            });
        }
        if src.bands() != dst.bands() {
            return Err(WarpError::SizeMismatch {
                expected: src.bands(),
                actual: dst.bands(),
            });
        }
        debug!(
            "warp {} tile {:?} from window {:?}",
            src.kind(),
            dst.bounds(),
            src.bounds()
        );

        match (src, dst) {
            (RasterBuffer::Bit(s), RasterBuffer::Bit(d)) => {
                let bytes = s.unpack();
                let mut out = d.unpack();
                self.compute_tile(&bytes, &mut out);
                *d = BitRaster::pack(&out);
            }
            (RasterBuffer::Byte(s), RasterBuffer::Byte(d)) => self.compute_tile(s, d),
            (RasterBuffer::Short(s), RasterBuffer::Short(d)) => self.compute_tile(s, d),
            (RasterBuffer::UShort(s), RasterBuffer::UShort(d)) => self.compute_tile(s, d),
            (RasterBuffer::Int(s), RasterBuffer::Int(d)) => self.compute_tile(s, d),
            (RasterBuffer::Float(s), RasterBuffer::Float(d)) => self.compute_tile(s, d),
            (RasterBuffer::Double(s), RasterBuffer::Double(d)) => self.compute_tile(s, d),
            _ => unreachable!("kinds were checked to match"),
        }
        Ok(())
    }

    /// Runtime-typed counterpart of [`apply`](Self::apply).
    pub fn apply_dyn(&self, src: &RasterBuffer, dst_rect: Rect) -> RasterBuffer {
        match src {
            RasterBuffer::Bit(s) => {
                let bytes = self.apply(&s.unpack(), dst_rect);
                RasterBuffer::Bit(BitRaster::pack(&bytes))
            }
            RasterBuffer::Byte(s) => self.apply(s, dst_rect).into(),
            RasterBuffer::Short(s) => self.apply(s, dst_rect).into(),
            RasterBuffer::UShort(s) => self.apply(s, dst_rect).into(),
            RasterBuffer::Int(s) => self.apply(s, dst_rect).into(),
            RasterBuffer::Float(s) => self.apply(s, dst_rect).into(),
            RasterBuffer::Double(s) => self.apply(s, dst_rect).into(),
        }
    }
}

/// Converts configured per-band values into `bands` samples, repeating the
/// last value.
fn broadcast<S: Sample>(values: &[f64], bands: usize) -> Vec<S> {
    (0..bands)
        .map(|b| S::from_float(values[b.min(values.len() - 1)]))
        .collect()
}
