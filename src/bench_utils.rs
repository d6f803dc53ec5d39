//! Shared helpers for benchmark drivers.

use crate::{AffineMap, Interpolation, Raster, Rect, Sample};

pub const BENCH_SIZES: [usize; 4] = [256, 512, 1024, 2048];
pub const BENCH_INTERPOLATIONS: [Interpolation; 3] = [
    Interpolation::Nearest,
    Interpolation::Bilinear,
    Interpolation::Bicubic,
];
pub const BENCH_ANGLES: [f64; 4] = [0.0, 15.0, 45.0, 90.0];

/// Diagonal gradient over all bands, scaled to the kind's useful range.
pub fn create_test_raster<S: Sample>(width: usize, height: usize, bands: usize) -> Raster<S> {
    let mut raster = Raster::new(Rect::new(0, 0, width, height), bands);
    let scale = if S::FLOATING {
        1.0
    } else {
        S::max_value().to_f64().unwrap_or(255.0).min(65535.0)
    };
    for y in 0..height {
        let row = raster.row_mut(y);
        for x in 0..width {
            for b in 0..bands {
                let val = (x + y * (b + 1)) as f64 / (width + height * bands) as f64;
                row[x * bands + b] = S::from_float(val * scale);
            }
        }
    }
    raster
}

/// Rotation by `angle_degrees` about the center of a `size` x `size` image.
pub fn centered_rotation(size: usize, angle_degrees: f64) -> AffineMap {
    let center = size as f64 / 2.0;
    AffineMap::rotation_about(angle_degrees.to_radians(), center, center)
        .unwrap_or_else(|_| AffineMap::identity())
}
