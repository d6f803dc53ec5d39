//! Nearest, bilinear and bicubic reconstruction kernels.
//!
//! Integer sample kinds interpolate in 64-bit fixed point: bilinear weights
//! are quantized to `subsample_bits` per axis and bicubic weights come from a
//! [`CubicTable`] built once per operation. Floating kinds use the exact
//! fractional position and untabulated weights.
//!
//! Every kernel receives the tap anchor `(ix, iy)` from the walker and reads
//! the taps it needs around it:
//!
//! ```text
//! nearest   ix          x  iy
//! bilinear  ix..=ix+1   x  iy..=iy+1
//! bicubic   ix-1..=ix+2 x  iy-1..=iy+2
//! ```
//!
//! With an active classifier, invalid taps are excluded (bilinear) or
//! reconstructed by inpainting (bicubic). A kernel whose taps are all invalid
//! yields `None`.

use std::fmt;
use std::str::FromStr;

use crate::error::WarpError;
use crate::inpaint::inpaint;
use crate::plane::SamplePlane;
use crate::raster::Rect;
use crate::sample::Sample;
use crate::validity::TapClassifier;
use crate::walker::{FRAC_BITS, FRAC_ONE, SourcePos};

/// Reconstruction kernel selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    #[default]
    Nearest,
    Bilinear,
    Bicubic,
}

impl Interpolation {
    /// Taps needed before and after the anchor on each axis.
    pub fn padding(self) -> (i64, i64) {
        match self {
            Interpolation::Nearest => (0, 0),
            Interpolation::Bilinear => (0, 1),
            Interpolation::Bicubic => (1, 2),
        }
    }

    /// Offset subtracted from back-projected pixel centers.
    pub fn origin_shift(self) -> f64 {
        match self {
            Interpolation::Nearest => 0.0,
            Interpolation::Bilinear | Interpolation::Bicubic => 0.5,
        }
    }

    /// Anchors inside `source` whose full kernel stays inside `source`.
    pub fn anchor_support(self, source: Rect) -> Rect {
        let (before, after) = self.padding();
        Rect::from_corners(
            source.x + before,
            source.y + before,
            source.max_x() - after,
            source.max_y() - after,
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Interpolation::Nearest => "nearest",
            Interpolation::Bilinear => "bilinear",
            Interpolation::Bicubic => "bicubic",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Interpolation {
    type Err = WarpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" | "nn" => Ok(Interpolation::Nearest),
            "bilinear" | "linear" => Ok(Interpolation::Bilinear),
            "bicubic" | "cubic" => Ok(Interpolation::Bicubic),
            _ => Err(WarpError::InvalidParameter(format!(
                "unknown interpolation: {s}"
            ))),
        }
    }
}

/// Cubic convolution weights for the taps at offsets -1, 0, 1, 2 from the
/// anchor, for a sample at fraction `t` past the anchor.
///
/// `a = -0.5` gives the Keys kernel, `a = -1.0` the sharper variant. The
/// weights always sum to one.
#[inline(always)]
pub fn cubic_weights(t: f64, a: f64) -> [f64; 4] {
    let inner = |d: f64| ((a + 2.0) * d - (a + 3.0)) * d * d + 1.0;
    let outer = |d: f64| ((a * d - 5.0 * a) * d + 8.0 * a) * d - 4.0 * a;
    [outer(1.0 + t), inner(t), inner(1.0 - t), outer(2.0 - t)]
}

/// Fixed-point bicubic weights tabulated per sub-pixel phase.
///
/// Each phase's weights are adjusted so they sum to exactly
/// `1 << precision_bits`, which keeps flat regions flat.
#[derive(Clone, Debug, PartialEq)]
pub struct CubicTable {
    subsample_bits: u32,
    precision_bits: u32,
    a: f64,
    weights: Vec<[i64; 4]>,
}

impl CubicTable {
    pub fn new(subsample_bits: u32, precision_bits: u32, a: f64) -> Self {
        let phases = 1usize << subsample_bits;
        let one = 1i64 << precision_bits;
        let weights = (0..phases)
            .map(|phase| {
                let t = phase as f64 / phases as f64;
                let mut w = cubic_weights(t, a).map(|v| (v * one as f64).round() as i64);
                let error = one - w.iter().sum::<i64>();
                // Put the rounding error on the tap nearest the sample.
                if phase * 2 <= phases {
                    w[1] += error;
                } else {
                    w[2] += error;
                }
                w
            })
            .collect();
        Self {
            subsample_bits,
            precision_bits,
            a,
            weights,
        }
    }

    pub fn subsample_bits(&self) -> u32 {
        self.subsample_bits
    }

    pub fn precision_bits(&self) -> u32 {
        self.precision_bits
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn phases(&self) -> usize {
        self.weights.len()
    }

    /// Tabulated weights for a fixed-point fraction.
    #[inline(always)]
    pub fn fixed_weights(&self, frac: i64) -> &[i64; 4] {
        &self.weights[(frac >> (FRAC_BITS - self.subsample_bits)) as usize]
    }

    /// Exact weights for a fixed-point fraction.
    #[inline(always)]
    pub fn float_weights(&self, frac: i64) -> [f64; 4] {
        cubic_weights(frac as f64 / FRAC_ONE as f64, self.a)
    }
}

/// A configured reconstruction kernel.
#[derive(Clone, Debug, PartialEq)]
pub enum Kernel {
    Nearest,
    Bilinear { subsample_bits: u32 },
    Bicubic(CubicTable),
}

impl Kernel {
    pub fn new(
        interpolation: Interpolation,
        subsample_bits: u32,
        precision_bits: u32,
        a: f64,
    ) -> Self {
        match interpolation {
            Interpolation::Nearest => Kernel::Nearest,
            Interpolation::Bilinear => Kernel::Bilinear { subsample_bits },
            Interpolation::Bicubic => {
                Kernel::Bicubic(CubicTable::new(subsample_bits, precision_bits, a))
            }
        }
    }

    pub fn interpolation(&self) -> Interpolation {
        match self {
            Kernel::Nearest => Interpolation::Nearest,
            Kernel::Bilinear { .. } => Interpolation::Bilinear,
            Kernel::Bicubic(_) => Interpolation::Bicubic,
        }
    }

    /// Interpolates one band at `pos`. The caller guarantees every tap lies
    /// inside `plane`.
    #[inline]
    pub fn sample<S: Sample, C: TapClassifier>(
        &self,
        plane: &SamplePlane<'_, S>,
        classifier: &C,
        pos: SourcePos,
    ) -> Option<S> {
        match self {
            Kernel::Nearest => nearest(plane, classifier, pos),
            Kernel::Bilinear { subsample_bits } => {
                if S::FLOATING {
                    bilinear_float(plane, classifier, pos)
                } else {
                    bilinear_fixed(plane, classifier, pos, *subsample_bits)
                }
            }
            Kernel::Bicubic(table) => {
                if S::FLOATING {
                    bicubic_float(plane, classifier, pos, table)
                } else {
                    bicubic_fixed(plane, classifier, pos, table)
                }
            }
        }
    }
}

#[inline(always)]
fn nearest<S: Sample, C: TapClassifier>(
    plane: &SamplePlane<'_, S>,
    classifier: &C,
    pos: SourcePos,
) -> Option<S> {
    let (x, y) = (pos.x.int, pos.y.int);
    if C::MASKED && !classifier.is_valid(plane, x, y) {
        return None;
    }
    Some(plane.get(x, y))
}

#[inline(always)]
fn quad_validity<S: Sample, C: TapClassifier>(
    plane: &SamplePlane<'_, S>,
    classifier: &C,
    x: i64,
    y: i64,
) -> [bool; 4] {
    if !C::MASKED {
        return [true; 4];
    }
    [
        classifier.is_valid(plane, x, y),
        classifier.is_valid(plane, x + 1, y),
        classifier.is_valid(plane, x, y + 1),
        classifier.is_valid(plane, x + 1, y + 1),
    ]
}

/// Rounds `num / den` to nearest for positive `den`.
#[inline(always)]
fn round_div(num: i128, den: i128) -> i128 {
    (2 * num + den).div_euclid(2 * den)
}

fn bilinear_fixed<S: Sample, C: TapClassifier>(
    plane: &SamplePlane<'_, S>,
    classifier: &C,
    pos: SourcePos,
    subsample_bits: u32,
) -> Option<S> {
    let (x, y) = (pos.x.int, pos.y.int);
    let valid = quad_validity(plane, classifier, x, y);
    let count = valid.iter().filter(|&&v| v).count();
    if count == 0 {
        return None;
    }

    let shift = FRAC_BITS - subsample_bits;
    let one = 1i128 << subsample_bits;
    let fx = (pos.x.frac >> shift) as i128;
    let fy = (pos.y.frac >> shift) as i128;
    let [t0, t1] = plane.row2(x, y);
    let [t2, t3] = plane.row2(x, y + 1);
    let taps = [t0, t1, t2, t3].map(|t| t.to_fixed() as i128);
    let weights = [
        (one - fx) * (one - fy),
        fx * (one - fy),
        (one - fx) * fy,
        fx * fy,
    ];

    let value = if count == 4 {
        let sum: i128 = taps.iter().zip(&weights).map(|(t, w)| t * w).sum();
        let total_bits = 2 * subsample_bits;
        (sum + (1 << (total_bits - 1))) >> total_bits
    } else {
        let mut sum = 0i128;
        let mut weight = 0i128;
        let mut plain = 0i128;
        for i in 0..4 {
            if valid[i] {
                sum += taps[i] * weights[i];
                weight += weights[i];
                plain += taps[i];
            }
        }
        if weight == 0 {
            round_div(plain, count as i128)
        } else {
            round_div(sum, weight)
        }
    };
    Some(S::from_fixed(value as i64))
}

fn bilinear_float<S: Sample, C: TapClassifier>(
    plane: &SamplePlane<'_, S>,
    classifier: &C,
    pos: SourcePos,
) -> Option<S> {
    let (x, y) = (pos.x.int, pos.y.int);
    let valid = quad_validity(plane, classifier, x, y);
    let count = valid.iter().filter(|&&v| v).count();
    if count == 0 {
        return None;
    }

    let fx = pos.x.frac as f64 / FRAC_ONE as f64;
    let fy = pos.y.frac as f64 / FRAC_ONE as f64;
    let [t0, t1] = plane.row2(x, y);
    let [t2, t3] = plane.row2(x, y + 1);
    let taps = [t0, t1, t2, t3].map(S::to_float);
    let weights = [
        (1.0 - fx) * (1.0 - fy),
        fx * (1.0 - fy),
        (1.0 - fx) * fy,
        fx * fy,
    ];

    let value: f64 = if count == 4 {
        taps.iter().zip(&weights).map(|(t, w)| t * w).sum()
    } else {
        let mut sum = 0.0;
        let mut weight = 0.0;
        let mut plain = 0.0;
        for i in 0..4 {
            if valid[i] {
                sum += taps[i] * weights[i];
                weight += weights[i];
                plain += taps[i];
            }
        }
        if weight == 0.0 {
            plain / count as f64
        } else {
            sum / weight
        }
    };
    Some(S::from_float(value))
}

#[inline(always)]
fn row_validity<S: Sample, C: TapClassifier>(
    plane: &SamplePlane<'_, S>,
    classifier: &C,
    x: i64,
    y: i64,
) -> [bool; 4] {
    [0, 1, 2, 3].map(|i| classifier.is_valid(plane, x + i, y))
}

fn bicubic_fixed<S: Sample, C: TapClassifier>(
    plane: &SamplePlane<'_, S>,
    classifier: &C,
    pos: SourcePos,
    table: &CubicTable,
) -> Option<S> {
    let x = pos.x.int - 1;
    let y = pos.y.int - 1;
    let wx = table.fixed_weights(pos.x.frac);
    let wy = table.fixed_weights(pos.y.frac);
    let precision = table.precision_bits();
    let round = 1i64 << (precision - 1);
    let dot = |t: [i64; 4], w: &[i64; 4]| t[0] * w[0] + t[1] * w[1] + t[2] * w[2] + t[3] * w[3];

    let mut sums = [0i64; 4];
    let mut row_valid = [true; 4];
    for (j, sum) in sums.iter_mut().enumerate() {
        let ty = y + j as i64;
        let mut taps = plane.row4(x, ty).map(S::to_fixed);
        if C::MASKED {
            let valid = row_validity(plane, classifier, x, ty);
            row_valid[j] = valid.contains(&true);
            taps = inpaint(taps, valid);
        }
        *sum = (dot(taps, wx) + round) >> precision;
    }

    if C::MASKED {
        if !row_valid.contains(&true) {
            return None;
        }
        sums = inpaint(sums, row_valid);
    }
    Some(S::from_fixed((dot(sums, wy) + round) >> precision))
}

fn bicubic_float<S: Sample, C: TapClassifier>(
    plane: &SamplePlane<'_, S>,
    classifier: &C,
    pos: SourcePos,
    table: &CubicTable,
) -> Option<S> {
    let x = pos.x.int - 1;
    let y = pos.y.int - 1;
    let wx = table.float_weights(pos.x.frac);
    let wy = table.float_weights(pos.y.frac);
    let dot = |t: [f64; 4], w: &[f64; 4]| t[0] * w[0] + t[1] * w[1] + t[2] * w[2] + t[3] * w[3];

    let mut sums = [0.0f64; 4];
    let mut row_valid = [true; 4];
    for (j, sum) in sums.iter_mut().enumerate() {
        let ty = y + j as i64;
        let mut taps = plane.row4(x, ty).map(S::to_float);
        if C::MASKED {
            let valid = row_validity(plane, classifier, x, ty);
            row_valid[j] = valid.contains(&true);
            taps = inpaint(taps, valid);
        }
        *sum = dot(taps, &wx);
    }

    if C::MASKED {
        if !row_valid.contains(&true) {
            return None;
        }
        sums = inpaint(sums, row_valid);
    }
    Some(S::from_float(dot(sums, &wy)))
}
