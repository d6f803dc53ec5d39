//! Numeric sample kinds and the per-kind arithmetic capability.
//!
//! Integer kinds interpolate in 64-bit fixed point and narrow with a per-kind
//! clamp. Floating kinds interpolate in `f64` and are never clamped.

use std::fmt;
use std::str::FromStr;

use num_traits::{Bounded, NumCast, ToPrimitive};

use crate::error::WarpError;

/// Numeric representation of one sample.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SampleKind {
    /// 1-bit packed binary data.
    Bit,
    Byte,
    Short,
    UShort,
    Int,
    Float,
    Double,
}

impl SampleKind {
    pub fn is_floating(self) -> bool {
        matches!(self, SampleKind::Float | SampleKind::Double)
    }

    pub fn name(self) -> &'static str {
        match self {
            SampleKind::Bit => "bit",
            SampleKind::Byte => "byte",
            SampleKind::Short => "short",
            SampleKind::UShort => "ushort",
            SampleKind::Int => "int",
            SampleKind::Float => "float",
            SampleKind::Double => "double",
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SampleKind {
    type Err = WarpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bit" | "binary" => Ok(SampleKind::Bit),
            "byte" | "u8" => Ok(SampleKind::Byte),
            "short" | "i16" => Ok(SampleKind::Short),
            "ushort" | "u16" => Ok(SampleKind::UShort),
            "int" | "i32" => Ok(SampleKind::Int),
            "float" | "f32" => Ok(SampleKind::Float),
            "double" | "f64" => Ok(SampleKind::Double),
            _ => Err(WarpError::UnsupportedKind(s.to_string())),
        }
    }
}

/// Read/clamp/write capability for one numeric representation.
///
/// The resampling engine is written once against this trait; each
/// implementation decides how an interpolated accumulator narrows back into
/// the stored type.
pub trait Sample:
    Copy
    + PartialEq
    + PartialOrd
    + Default
    + fmt::Debug
    + Bounded
    + ToPrimitive
    + Send
    + Sync
    + 'static
{
    const KIND: SampleKind;

    /// True for kinds interpolated in floating point.
    const FLOATING: bool;

    /// Widens into the fixed-point accumulator domain.
    fn to_fixed(self) -> i64;

    fn to_float(self) -> f64;

    /// Narrows a fixed-point interpolation result into this kind.
    fn from_fixed(value: i64) -> Self;

    /// Narrows a floating interpolation result, or a configured fill value,
    /// into this kind.
    fn from_float(value: f64) -> Self;

    fn is_nan(self) -> bool {
        false
    }
}

macro_rules! impl_integer_sample {
    ($t:ty, $kind:ident, |$v:ident| $narrow:expr) => {
        impl Sample for $t {
            const KIND: SampleKind = SampleKind::$kind;
            const FLOATING: bool = false;

            #[inline(always)]
            fn to_fixed(self) -> i64 {
                self as i64
            }

            #[inline(always)]
            fn to_float(self) -> f64 {
                self as f64
            }

            #[inline(always)]
            fn from_fixed($v: i64) -> Self {
                $narrow
            }

            fn from_float(value: f64) -> Self {
                if value.is_nan() {
                    return <$t>::default();
                }
                <$t as NumCast>::from(value.round()).unwrap_or_else(|| {
                    if value < 0.0 {
                        <$t as Bounded>::min_value()
                    } else {
                        <$t as Bounded>::max_value()
                    }
                })
            }
        }
    };
}

impl_integer_sample!(u8, Byte, |v| v.clamp(0, u8::MAX as i64) as u8);
impl_integer_sample!(i16, Short, |v| v.clamp(i16::MIN as i64, i16::MAX as i64) as i16);
impl_integer_sample!(u16, UShort, |v| v.clamp(0, u16::MAX as i64) as u16);
// 32-bit results are truncated from the accumulator without a clamp.
impl_integer_sample!(i32, Int, |v| v as i32);

impl Sample for f32 {
    const KIND: SampleKind = SampleKind::Float;
    const FLOATING: bool = true;

    #[inline(always)]
    fn to_fixed(self) -> i64 {
        self as i64
    }

    #[inline(always)]
    fn to_float(self) -> f64 {
        self as f64
    }

    #[inline(always)]
    fn from_fixed(value: i64) -> Self {
        value as f32
    }

    #[inline(always)]
    fn from_float(value: f64) -> Self {
        value as f32
    }

    #[inline(always)]
    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

impl Sample for f64 {
    const KIND: SampleKind = SampleKind::Double;
    const FLOATING: bool = true;

    #[inline(always)]
    fn to_fixed(self) -> i64 {
        self as i64
    }

    #[inline(always)]
    fn to_float(self) -> f64 {
        self
    }

    #[inline(always)]
    fn from_fixed(value: i64) -> Self {
        value as f64
    }

    #[inline(always)]
    fn from_float(value: f64) -> Self {
        value
    }

    #[inline(always)]
    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}
