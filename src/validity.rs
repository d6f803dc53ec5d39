//! ROI and no-data classification of source taps.
//!
//! A tap is usable when it lies inside the region of interest (if one is
//! configured) and its sample is outside the no-data range (if one is
//! configured). The dispatcher picks one of four classifiers up front so the
//! unmasked path pays for neither test.

use std::sync::Arc;

use crate::error::{Result, WarpError};
use crate::plane::SamplePlane;
use crate::raster::Rect;
use crate::sample::Sample;

/// Boolean pixel mask over a rectangle of the source image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoiMask {
    bounds: Rect,
    data: Vec<bool>,
}

impl RoiMask {
    pub fn new(bounds: Rect, data: Vec<bool>) -> Result<Self> {
        let expected = bounds.width * bounds.height;
        if data.len() != expected {
            return Err(WarpError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { bounds, data })
    }

    /// Builds a mask by evaluating `f` at every absolute pixel position.
    pub fn from_fn(bounds: Rect, mut f: impl FnMut(i64, i64) -> bool) -> Self {
        let mut data = Vec::with_capacity(bounds.width * bounds.height);
        for y in bounds.y..bounds.max_y() {
            for x in bounds.x..bounds.max_x() {
                data.push(f(x, y));
            }
        }
        Self { bounds, data }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Mask value at absolute `(x, y)`; positions outside the mask are not
    /// part of the region.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        if !self.bounds.contains(x, y) {
            return false;
        }
        let lx = (x - self.bounds.x) as usize;
        let ly = (y - self.bounds.y) as usize;
        self.data[ly * self.bounds.width + lx]
    }
}

/// Region of interest in source coordinates.
#[derive(Clone, Debug, PartialEq)]
pub enum Roi {
    /// Per-pixel mask, shared between operations and workers.
    Mask(Arc<RoiMask>),
    /// Geometric bounds test used in place of a rasterized mask.
    Bounds(Rect),
}

impl Roi {
    pub fn mask(mask: RoiMask) -> Self {
        Roi::Mask(Arc::new(mask))
    }

    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        match self {
            Roi::Mask(mask) => mask.contains(x, y),
            Roi::Bounds(rect) => rect.contains(x, y),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Roi::Mask(mask) => mask.bounds(),
            Roi::Bounds(rect) => *rect,
        }
    }
}

/// Range of sample values treated as missing data.
///
/// NaN samples are always no-data once a range is configured. A range built
/// with [`NoDataRange::point`] from NaN matches NaN and nothing else.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NoDataRange {
    min: f64,
    max: f64,
    min_inclusive: bool,
    max_inclusive: bool,
}

impl NoDataRange {
    pub fn new(min: f64, max: f64, min_inclusive: bool, max_inclusive: bool) -> Result<Self> {
        if min.is_nan() || max.is_nan() {
            return Err(WarpError::InvalidParameter(
                "no-data range bounds must not be NaN; use NoDataRange::point(f64::NAN)".into(),
            ));
        }
        if min > max {
            return Err(WarpError::InvalidParameter(format!(
                "no-data range is inverted: [{min}, {max}]"
            )));
        }
        Ok(Self {
            min,
            max,
            min_inclusive,
            max_inclusive,
        })
    }

    /// A single no-data value.
    pub fn point(value: f64) -> Self {
        Self {
            min: value,
            max: value,
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains_value(&self, value: f64) -> bool {
        if value.is_nan() {
            return true;
        }
        if self.min.is_nan() {
            return false;
        }
        let above = if self.min_inclusive {
            value >= self.min
        } else {
            value > self.min
        };
        let below = if self.max_inclusive {
            value <= self.max
        } else {
            value < self.max
        };
        above && below
    }

    #[inline]
    pub fn contains<S: Sample>(&self, sample: S) -> bool {
        sample.is_nan() || self.contains_value(sample.to_float())
    }
}

/// Which validity tests are active for an operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MaskCase {
    Unmasked,
    RoiOnly,
    NoDataOnly,
    RoiAndNoData,
}

impl MaskCase {
    pub fn new(has_roi: bool, has_no_data: bool) -> Self {
        match (has_roi, has_no_data) {
            (false, false) => MaskCase::Unmasked,
            (true, false) => MaskCase::RoiOnly,
            (false, true) => MaskCase::NoDataOnly,
            (true, true) => MaskCase::RoiAndNoData,
        }
    }

    pub fn is_masked(self) -> bool {
        self != MaskCase::Unmasked
    }
}

/// Decides whether a single source tap can contribute to interpolation.
pub trait TapClassifier {
    /// False only for the classifier that accepts every tap.
    const MASKED: bool;

    fn is_valid<S: Sample>(&self, plane: &SamplePlane<'_, S>, x: i64, y: i64) -> bool;
}

/// Accepts every tap.
pub struct AllValid;

impl TapClassifier for AllValid {
    const MASKED: bool = false;

    #[inline(always)]
    fn is_valid<S: Sample>(&self, _plane: &SamplePlane<'_, S>, _x: i64, _y: i64) -> bool {
        true
    }
}

pub struct RoiClassifier<'a> {
    pub roi: &'a Roi,
}

impl TapClassifier for RoiClassifier<'_> {
    const MASKED: bool = true;

    #[inline(always)]
    fn is_valid<S: Sample>(&self, _plane: &SamplePlane<'_, S>, x: i64, y: i64) -> bool {
        self.roi.contains(x, y)
    }
}

pub struct NoDataClassifier<'a> {
    pub range: &'a NoDataRange,
}

impl TapClassifier for NoDataClassifier<'_> {
    const MASKED: bool = true;

    #[inline(always)]
    fn is_valid<S: Sample>(&self, plane: &SamplePlane<'_, S>, x: i64, y: i64) -> bool {
        plane.contains(x, y) && !self.range.contains(plane.get(x, y))
    }
}

pub struct RoiNoDataClassifier<'a> {
    pub roi: &'a Roi,
    pub range: &'a NoDataRange,
}

impl TapClassifier for RoiNoDataClassifier<'_> {
    const MASKED: bool = true;

    #[inline(always)]
    fn is_valid<S: Sample>(&self, plane: &SamplePlane<'_, S>, x: i64, y: i64) -> bool {
        self.roi.contains(x, y) && plane.contains(x, y) && !self.range.contains(plane.get(x, y))
    }
}
