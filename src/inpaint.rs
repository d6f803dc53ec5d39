//! Reconstruction of missing taps in a 4-tap kernel line.
//!
//! Bicubic interpolation needs all sixteen taps. When some are invalid the
//! line is completed from its valid neighbours: nearest valid values are
//! replicated outward and interior gaps take the mean of the taps around
//! them. The same table runs on each kernel row and then on the four row
//! sums.

/// Accumulator arithmetic used while inpainting.
pub trait Midpoint: Copy + Default {
    fn midpoint(a: Self, b: Self) -> Self;
}

impl Midpoint for i64 {
    /// Truncates toward zero.
    #[inline(always)]
    fn midpoint(a: Self, b: Self) -> Self {
        (a + b) / 2
    }
}

impl Midpoint for f64 {
    #[inline(always)]
    fn midpoint(a: Self, b: Self) -> Self {
        (a + b) / 2.0
    }
}

/// Completes a partially valid 4-tap line.
///
/// The support size is fixed by the array types. With no valid taps the line
/// becomes all zeros; with every tap valid it is returned unchanged.
#[inline]
pub fn inpaint<T: Midpoint>(taps: [T; 4], valid: [bool; 4]) -> [T; 4] {
    let [t0, t1, t2, t3] = taps;
    let mean = T::midpoint;
    match valid {
        [true, true, true, true] => taps,

        [false, false, false, false] => [T::default(); 4],
        [true, false, false, false] => [t0; 4],
        [false, true, false, false] => [t1; 4],
        [false, false, true, false] => [t2; 4],
        [false, false, false, true] => [t3; 4],

        [false, false, true, true] => [t2, t2, t2, t3],
        [false, true, false, true] => [t1, t1, mean(t1, t3), t3],
        [false, true, true, false] => [t1, t1, t2, t2],
        [true, false, false, true] => {
            let m = mean(t0, t3);
            [t0, m, m, t3]
        }
        [true, false, true, false] => [t0, mean(t0, t2), t2, t2],
        [true, true, false, false] => [t0, t1, t1, t1],

        [false, true, true, true] => [t1, t1, t2, t3],
        [true, false, true, true] => [t0, mean(t0, t2), t2, t3],
        [true, true, false, true] => [t0, t1, mean(t1, t3), t3],
        [true, true, true, false] => [t0, t1, t2, t2],
    }
}
