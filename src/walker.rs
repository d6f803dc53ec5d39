//! Fixed-point scanline geometry.
//!
//! Source positions are tracked as an integer pixel plus a fraction in units
//! of `1 / FRAC_ONE`. Rows are cut into anchor runs at absolute destination
//! columns that are multiples of `ANCHOR_SPAN`. Each run gets one
//! floating-point back-projection at its anchor column, and every further
//! column is reached by adding a precomputed fixed-point step with carry.
//! The rounding of that step therefore accumulates over at most
//! `ANCHOR_SPAN` columns, wherever the raster sits in image space.
//!
//! Because stepping is exact integer arithmetic, the position of column `k`
//! of a run is `start + k * step` in raw units. Scanline clipping uses that
//! closed form to find the columns whose kernel stays inside the source
//! support without walking the run.

use std::iter;
use std::ops::Range;

use crate::affine::AffineMap;
use crate::raster::Rect;

/// Number of fractional bits in a fixed-point position.
pub const FRAC_BITS: u32 = 20;

/// The fixed denominator `D`.
pub const FRAC_ONE: i64 = 1 << FRAC_BITS;

/// Destination columns stepped from one floating-point back-projection.
pub const ANCHOR_SPAN: usize = 64;

/// An (integer, fraction) pair with `0 <= frac < FRAC_ONE`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FixedPos {
    pub int: i64,
    pub frac: i64,
}

impl FixedPos {
    pub fn from_raw(raw: i64) -> Self {
        Self {
            int: raw.div_euclid(FRAC_ONE),
            frac: raw.rem_euclid(FRAC_ONE),
        }
    }

    /// Rounds `value` to the nearest representable position.
    pub fn from_f64(value: f64) -> Self {
        Self::from_raw((value * FRAC_ONE as f64).round() as i64)
    }

    pub fn raw(&self) -> i64 {
        self.int * FRAC_ONE + self.frac
    }

    pub fn to_f64(&self) -> f64 {
        self.int as f64 + self.frac as f64 / FRAC_ONE as f64
    }

    /// Advances by one column step, carrying fractional overflow into `int`.
    #[inline(always)]
    pub fn advance(&mut self, step: FixedStep) {
        if self.frac < FRAC_ONE - step.frac {
            self.frac += step.frac;
            self.int += step.int;
        } else {
            self.frac -= FRAC_ONE - step.frac;
            self.int += step.int + 1;
        }
    }
}

/// Per-column increment split into whole pixels and a fraction in
/// `[0, FRAC_ONE)`. Negative steps carry a negative `int`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FixedStep {
    pub int: i64,
    pub frac: i64,
}

impl FixedStep {
    pub fn from_f64(delta: f64) -> Self {
        Self::from_raw((delta * FRAC_ONE as f64).round() as i64)
    }

    pub fn from_raw(raw: i64) -> Self {
        Self {
            int: raw.div_euclid(FRAC_ONE),
            frac: raw.rem_euclid(FRAC_ONE),
        }
    }

    pub fn raw(&self) -> i64 {
        self.int * FRAC_ONE + self.frac
    }
}

/// Source-space position of one destination column.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SourcePos {
    pub x: FixedPos,
    pub y: FixedPos,
}

/// Back-projects destination rows into source space.
#[derive(Copy, Clone, Debug)]
pub struct GeometryWalker {
    inverse: [f64; 6],
    origin_shift: f64,
    step_x: FixedStep,
    step_y: FixedStep,
}

impl GeometryWalker {
    /// `origin_shift` is subtracted from back-projected pixel centers on both
    /// axes: 0.5 for kernels anchored on the tap left of the sample point,
    /// 0.0 for nearest neighbour.
    pub fn new(map: &AffineMap, origin_shift: f64) -> Self {
        let inverse = *map.inverse();
        Self {
            inverse,
            origin_shift,
            step_x: FixedStep::from_f64(inverse[0]),
            step_y: FixedStep::from_f64(inverse[3]),
        }
    }

    pub fn step_x(&self) -> FixedStep {
        self.step_x
    }

    pub fn step_y(&self) -> FixedStep {
        self.step_y
    }

    /// Source position of the center of destination pixel `(dst_x, dst_y)`.
    pub fn position(&self, dst_x: i64, dst_y: i64) -> SourcePos {
        let m = &self.inverse;
        let cx = dst_x as f64 + 0.5;
        let cy = dst_y as f64 + 0.5;
        SourcePos {
            x: FixedPos::from_f64(m[0] * cx + m[1] * cy + m[2] - self.origin_shift),
            y: FixedPos::from_f64(m[3] * cx + m[4] * cy + m[5] - self.origin_shift),
        }
    }

    /// Starts a walk along row `dst_y` at column `dst_x`.
    ///
    /// The row is back-projected at the anchor column at or left of `dst_x`
    /// and stepped forward from there, so a pixel lands on the same
    /// fixed-point position whichever tile computes it. Positions stay exact
    /// up to the end of the anchor run containing `dst_x`.
    pub fn row(&self, dst_x: i64, dst_y: i64) -> RowCursor {
        let offset = dst_x.rem_euclid(ANCHOR_SPAN as i64);
        let mut cursor = RowCursor {
            pos: self.position(dst_x - offset, dst_y),
            step_x: self.step_x,
            step_y: self.step_y,
        };
        cursor.skip(offset);
        cursor
    }

    /// Columns `k` in `0..count` of the row starting at `start` whose integer
    /// source position lies inside `support` on both axes.
    pub fn clip(&self, start: SourcePos, count: usize, support: Rect) -> Option<Range<usize>> {
        clip_scanline(start, self.step_x, self.step_y, count, support)
    }
}

/// Incremental walker over the columns of one destination row.
#[derive(Copy, Clone, Debug)]
pub struct RowCursor {
    pos: SourcePos,
    step_x: FixedStep,
    step_y: FixedStep,
}

impl RowCursor {
    #[inline(always)]
    pub fn pos(&self) -> SourcePos {
        self.pos
    }

    #[inline(always)]
    pub fn advance(&mut self) {
        self.pos.x.advance(self.step_x);
        self.pos.y.advance(self.step_y);
    }

    /// Jumps `n` columns (backwards when negative) using the closed form.
    pub fn skip(&mut self, n: i64) {
        self.pos.x = FixedPos::from_raw(self.pos.x.raw() + n * self.step_x.raw());
        self.pos.y = FixedPos::from_raw(self.pos.y.raw() + n * self.step_y.raw());
    }
}

/// Splits the `count` columns starting at absolute column `dst_x` into runs
/// that never cross an anchor column. Runs are given as offsets from `dst_x`.
pub fn anchor_runs(dst_x: i64, count: usize) -> impl Iterator<Item = Range<usize>> {
    let span = ANCHOR_SPAN as i64;
    let mut start = 0;
    iter::from_fn(move || {
        if start >= count {
            return None;
        }
        let column = dst_x + start as i64;
        let end = count.min(start + (span - column.rem_euclid(span)) as usize);
        let run = start..end;
        start = end;
        Some(run)
    })
}

/// Closed-form scanline clipping.
///
/// Returns the sub-range of `0..count` whose positions
/// `start + k * step` have their integer part inside `support`, or `None`
/// when no column qualifies.
pub fn clip_scanline(
    start: SourcePos,
    step_x: FixedStep,
    step_y: FixedStep,
    count: usize,
    support: Rect,
) -> Option<Range<usize>> {
    if count == 0 || support.is_empty() {
        return None;
    }
    let last = count as i64 - 1;
    let (x0, x1) = axis_range(
        start.x.raw(),
        step_x.raw(),
        support.x,
        support.max_x(),
        last,
    )?;
    let (y0, y1) = axis_range(
        start.y.raw(),
        step_y.raw(),
        support.y,
        support.max_y(),
        last,
    )?;
    let k0 = x0.max(y0);
    let k1 = x1.min(y1);
    if k0 > k1 {
        return None;
    }
    Some(k0 as usize..k1 as usize + 1)
}

/// Inclusive range of `k` in `[0, last]` with
/// `lo <= floor((start + k * step) / FRAC_ONE) < hi`.
fn axis_range(start: i64, step: i64, lo: i64, hi: i64, last: i64) -> Option<(i64, i64)> {
    let min_raw = lo * FRAC_ONE;
    let max_raw = hi * FRAC_ONE - 1;

    let (k0, k1) = if step == 0 {
        if start < min_raw || start > max_raw {
            return None;
        }
        (0, last)
    } else if step > 0 {
        (
            ceil_div(min_raw - start, step),
            floor_div(max_raw - start, step),
        )
    } else {
        (
            ceil_div(max_raw - start, step),
            floor_div(min_raw - start, step),
        )
    };

    let k0 = k0.max(0);
    let k1 = k1.min(last);
    if k0 > k1 { None } else { Some((k0, k1)) }
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn ceil_div(a: i64, b: i64) -> i64 {
    -floor_div(-a, b)
}
