//! Forward/inverse 2x3 affine maps.
//!
//! Matrices are stored row-major as `[m00, m01, m02, m10, m11, m12]`:
//!
//! ```text
//! x' = m00 * x + m01 * y + m02
//! y' = m10 * x + m11 * y + m12
//! ```

use crate::error::{Result, WarpError};
use crate::raster::Rect;

/// Determinants smaller than this are treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

/// An invertible affine transform with its precomputed inverse.
///
/// Invertibility is checked once in [`AffineMap::new`]; every other
/// operation can rely on `inverse` being valid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AffineMap {
    forward: [f64; 6],
    inverse: [f64; 6],
}

impl AffineMap {
    pub fn new(matrix: [f64; 6]) -> Result<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(WarpError::InvalidParameter(format!(
                "affine matrix has non-finite entries: {matrix:?}"
            )));
        }
        let inverse = invert(&matrix)?;
        Ok(Self {
            forward: matrix,
            inverse,
        })
    }

    pub fn identity() -> Self {
        Self {
            forward: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            inverse: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        }
    }

    pub fn translation(tx: f64, ty: f64) -> Result<Self> {
        Self::new([1.0, 0.0, tx, 0.0, 1.0, ty])
    }

    pub fn scale(sx: f64, sy: f64) -> Result<Self> {
        Self::new([sx, 0.0, 0.0, 0.0, sy, 0.0])
    }

    /// Rotation by `angle` radians about the origin.
    pub fn rotation(angle: f64) -> Result<Self> {
        let (sin, cos) = angle.sin_cos();
        Self::new([cos, -sin, 0.0, sin, cos, 0.0])
    }

    /// Rotation by `angle` radians about `(cx, cy)`.
    pub fn rotation_about(angle: f64, cx: f64, cy: f64) -> Result<Self> {
        Self::translation(-cx, -cy)?
            .then(&Self::rotation(angle)?)?
            .then(&Self::translation(cx, cy)?)
    }

    /// Returns the map applying `self` first and `next` afterwards.
    pub fn then(&self, next: &AffineMap) -> Result<Self> {
        let a = &next.forward;
        let b = &self.forward;
        Self::new([
            a[0] * b[0] + a[1] * b[3],
            a[0] * b[1] + a[1] * b[4],
            a[0] * b[2] + a[1] * b[5] + a[2],
            a[3] * b[0] + a[4] * b[3],
            a[3] * b[1] + a[4] * b[4],
            a[3] * b[2] + a[4] * b[5] + a[5],
        ])
    }

    pub fn forward(&self) -> &[f64; 6] {
        &self.forward
    }

    pub fn inverse(&self) -> &[f64; 6] {
        &self.inverse
    }

    /// Swaps the forward and inverse directions.
    pub fn inverted(&self) -> Self {
        Self {
            forward: self.inverse,
            inverse: self.forward,
        }
    }

    pub fn determinant(&self) -> f64 {
        self.forward[0] * self.forward[4] - self.forward[1] * self.forward[3]
    }

    /// Maps a source point into destination space.
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        apply(&self.forward, x, y)
    }

    /// Maps a destination point back into source space.
    pub fn inverse_transform(&self, x: f64, y: f64) -> (f64, f64) {
        apply(&self.inverse, x, y)
    }

    /// Integer bounding box of `rect` after the forward map.
    ///
    /// Corners are mapped as pixel edges, so a pure translation by whole
    /// pixels shifts the rectangle without growing it.
    pub fn map_bounds(&self, rect: Rect) -> Rect {
        bounding_box(&self.forward, rect)
    }

    /// Integer bounding box of `rect` after the inverse map.
    pub fn inverse_map_bounds(&self, rect: Rect) -> Rect {
        bounding_box(&self.inverse, rect)
    }
}

#[inline(always)]
fn apply(m: &[f64; 6], x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[1] * y + m[2], m[3] * x + m[4] * y + m[5])
}

fn invert(m: &[f64; 6]) -> Result<[f64; 6]> {
    let det = m[0] * m[4] - m[1] * m[3];
    if !det.is_finite() || det.abs() < SINGULAR_EPSILON {
        return Err(WarpError::NonInvertible { determinant: det });
    }
    let inv_det = 1.0 / det;
    Ok([
        m[4] * inv_det,
        -m[1] * inv_det,
        (m[1] * m[5] - m[4] * m[2]) * inv_det,
        -m[3] * inv_det,
        m[0] * inv_det,
        (m[3] * m[2] - m[0] * m[5]) * inv_det,
    ])
}

fn bounding_box(m: &[f64; 6], rect: Rect) -> Rect {
    let x0 = rect.x as f64;
    let y0 = rect.y as f64;
    let x1 = rect.max_x() as f64;
    let y1 = rect.max_y() as f64;
    let corners = [
        apply(m, x0, y0),
        apply(m, x1, y0),
        apply(m, x1, y1),
        apply(m, x0, y1),
    ];

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for (x, y) in corners {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    // Snap values that only miss an integer by rounding noise.
    let lo = |v: f64| (v + 1e-9).floor() as i64;
    let hi = |v: f64| (v - 1e-9).ceil() as i64;
    let x = lo(min_x);
    let y = lo(min_y);
    Rect::new(x, y, (hi(max_x) - x).max(0) as usize, (hi(max_y) - y).max(0) as usize)
}
