use thiserror::Error;

use crate::sample::SampleKind;

/// Errors reported while configuring a warp or building its inputs.
///
/// Tile computation itself never fails on data: unusable positions resolve to
/// the destination no-data value or are left as background.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WarpError {
    #[error("affine transform is not invertible (determinant {determinant})")]
    NonInvertible { determinant: f64 },

    #[error("unsupported sample kind: {0}")]
    UnsupportedKind(String),

    #[error("source kind {src_kind} does not match destination kind {dst_kind}")]
    KindMismatch {
        src_kind: SampleKind,
        dst_kind: SampleKind,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, WarpError>;
