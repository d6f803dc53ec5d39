//! Affine raster resampling with ROI and no-data aware interpolation.
//!
//! # Design
//!
//! - **Geometry** ([`GeometryWalker`]): destination pixel centers are
//!   back-projected once per anchor run of `ANCHOR_SPAN` columns and stepped
//!   in exact fixed point per column. Scanline clipping finds the columns
//!   whose kernel stays inside the source window without walking them.
//! - **Validity** ([`Roi`], [`NoDataRange`]): a source tap contributes only
//!   when it lies in the region of interest and is not no-data.
//! - **Kernels** ([`Interpolation`]): nearest, bilinear and bicubic. Integer
//!   sample kinds interpolate in fixed point and clamp to their range;
//!   floating kinds interpolate in `f64`. Missing bicubic taps are
//!   reconstructed by inpainting.
//! - **Operator** ([`OpAffineWarp`]): validates its configuration once and then
//!   paints destination tiles. It is `Send + Sync`, so disjoint tiles can be
//!   computed concurrently.
//!
//! # Example
//!
//! ```
//! use rusty_warp::{AffineMap, Interpolation, OpAffineWarp, Raster, Rect, WarpConfig};
//!
//! let src = Raster::<u8>::filled(Rect::new(0, 0, 100, 100), 3, &[10, 20, 30]);
//!
//! let map = AffineMap::rotation_about(0.25, 50.0, 50.0).unwrap();
//! let mut config = WarpConfig::new();
//! config.set_interpolation(Interpolation::Bicubic).set_destination_no_data(&[255.0]);
//!
//! let op = OpAffineWarp::new(map, config).unwrap();
//! let dst = op.apply(&src, op.destination_bounds(src.bounds()));
//! assert_eq!(dst.bands(), 3);
//! ```

pub mod affine;
#[doc(hidden)]
pub mod bench_utils;
pub mod error;
pub mod inpaint;
pub mod interp;
pub mod op_affine_warp;
pub mod plane;
pub mod raster;
pub mod sample;
pub mod validity;
pub mod walker;

pub use crate::affine::AffineMap;
pub use crate::error::{Result, WarpError};
pub use crate::interp::{CubicTable, Interpolation, Kernel};
pub use crate::op_affine_warp::{K_TILE, OpAffineWarp, WarpConfig, WarpScratch};
pub use crate::plane::SamplePlane;
pub use crate::raster::{BitRaster, Raster, RasterBuffer, Rect};
pub use crate::sample::{Sample, SampleKind};
pub use crate::validity::{MaskCase, NoDataRange, Roi, RoiMask};
pub use crate::walker::{ANCHOR_SPAN, FRAC_BITS, FRAC_ONE, GeometryWalker};
