use std::thread;

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use rusty_warp::inpaint::inpaint;
use rusty_warp::{
    AffineMap, BitRaster, GeometryWalker, Interpolation, NoDataRange, OpAffineWarp, Raster,
    RasterBuffer, Rect, Roi, RoiMask, Sample, WarpConfig, WarpError, WarpScratch,
};

const KERNELS: [Interpolation; 3] = [
    Interpolation::Nearest,
    Interpolation::Bilinear,
    Interpolation::Bicubic,
];

fn pattern<S: Sample>(
    bounds: Rect,
    bands: usize,
    value: impl Fn(usize, usize, usize) -> f64,
) -> Raster<S> {
    let mut raster = Raster::new(bounds, bands);
    for y in 0..bounds.height {
        for x in 0..bounds.width {
            for (b, v) in raster.pixel_mut(x, y).iter_mut().enumerate() {
                *v = S::from_float(value(x, y, b));
            }
        }
    }
    raster
}

fn warp(map: AffineMap, interpolation: Interpolation) -> OpAffineWarp {
    let mut config = WarpConfig::new();
    config.set_interpolation(interpolation);
    OpAffineWarp::new(map, config).expect("valid warp")
}

fn check_identity<S: Sample>(value: impl Fn(usize, usize, usize) -> f64) {
    let src = pattern::<S>(Rect::new(-4, 3, 16, 12), 2, value);
    let dst_rect = Rect::new(-2, 5, 12, 8);
    for interpolation in KERNELS {
        let out = warp(AffineMap::identity(), interpolation).apply(&src, dst_rect);
        assert_eq!(out, src.crop(dst_rect), "{:?} {interpolation}", S::KIND);
    }
}

#[test]
fn test_identity_reproduces_every_kind() {
    check_identity::<u8>(|x, y, b| ((x * 31 + y * 17 + b * 5) % 256) as f64);
    check_identity::<i16>(|x, y, b| (x as f64 - 8.0) * 3000.0 + y as f64 * 7.0 - b as f64);
    check_identity::<u16>(|x, y, b| (x * 4000 + y * 97 + b) as f64);
    check_identity::<i32>(|x, y, b| (x as f64 - 8.0) * 2.0e8 + (y * 3 + b) as f64);
    check_identity::<f32>(|x, y, b| (x as f64 - 3.3) * 1.25 + y as f64 * 0.001 + b as f64);
    check_identity::<f64>(|x, y, b| (x as f64).sin() * 1e6 + y as f64 * 1e-6 - b as f64);
}

#[test]
fn test_identity_reproduces_bit_rasters() {
    let bounds = Rect::new(0, 0, 19, 6);
    let mut bits = BitRaster::new(bounds);
    for y in 0..6 {
        for x in 0..19 {
            bits.set(x, y, (x * 3 + y) % 4 == 0);
        }
    }
    let src = RasterBuffer::from(bits.clone());
    for interpolation in KERNELS {
        let op = warp(AffineMap::identity(), interpolation);
        let mut dst = RasterBuffer::new(src.kind(), Rect::new(2, 2, 12, 2), 1);
        op.compute_tile_dyn(&src, &mut dst).expect("kinds match");
        let RasterBuffer::Bit(out) = dst else {
            panic!("expected a bit raster");
        };
        for y in 2..4 {
            for x in 2..14 {
                assert_eq!(out.get(x, y), bits.get(x, y), "{interpolation} at ({x}, {y})");
            }
        }
    }
}

#[test]
fn test_dyn_apply_translates_bits() {
    let mut bits = BitRaster::new(Rect::new(0, 0, 8, 1));
    bits.set(2, 0, true);
    let op = warp(AffineMap::translation(3.0, 0.0).expect("shift"), Interpolation::Nearest);
    let RasterBuffer::Bit(out) = op.apply_dyn(&bits.into(), Rect::new(0, 0, 8, 1)) else {
        panic!("expected a bit raster");
    };
    assert_eq!(out.packed(), &[0b0000_0100]);
}

#[test]
fn test_dyn_rejects_band_mismatch() {
    let op = warp(AffineMap::identity(), Interpolation::Nearest);
    let src = RasterBuffer::from(Raster::<u8>::new(Rect::new(0, 0, 2, 2), 3));
    let mut dst = RasterBuffer::from(Raster::<u8>::new(Rect::new(0, 0, 2, 2), 1));
    assert_eq!(
        op.compute_tile_dyn(&src, &mut dst),
        Err(WarpError::SizeMismatch {
            expected: 3,
            actual: 1
        })
    );
}

#[test]
fn test_roi_excluded_support_gets_exact_no_data() {
    let bounds = Rect::new(0, 0, 14, 14);
    let src = pattern::<f32>(bounds, 3, |x, y, b| (x + y + b) as f64 + 0.5);
    let hole = Rect::new(4, 4, 6, 6);
    let mask = RoiMask::from_fn(bounds, |x, y| !hole.contains(x, y));

    let mut config = WarpConfig::new();
    config
        .set_interpolation(Interpolation::Bicubic)
        .set_roi(Some(Roi::mask(mask)))
        .set_destination_no_data(&[-1.0, -2.0, -3.0]);
    let op = OpAffineWarp::new(AffineMap::identity(), config.clone()).expect("valid warp");
    let out = op.apply(&src, bounds);

    assert_eq!(out.pixel(6, 6), &[-1.0, -2.0, -3.0]);
    assert_eq!(out.pixel(7, 7), &[-1.0, -2.0, -3.0]);
    assert_eq!(out.pixel(11, 11), src.pixel(11, 11));

    config.set_fill_no_data(false).set_background(&[42.0]);
    let op = OpAffineWarp::new(AffineMap::identity(), config).expect("valid warp");
    let out = op.apply(&src, bounds);
    assert_eq!(out.pixel(6, 6), &[42.0, 42.0, 42.0]);
}

#[test]
fn test_partial_roi_support_is_inpainted() {
    let bounds = Rect::new(0, 0, 8, 8);
    let src = Raster::<u8>::filled(bounds, 1, &[90]);
    let mask = RoiMask::from_fn(bounds, |x, _| x >= 3);
    let mut config = WarpConfig::new();
    config
        .set_interpolation(Interpolation::Bicubic)
        .set_roi(Some(Roi::mask(mask)))
        .set_destination_no_data(&[0.0]);
    let op = OpAffineWarp::new(AffineMap::translation(0.4, 0.0).expect("shift"), config)
        .expect("valid warp");
    let out = op.apply(&src, bounds);
    // Anchors 2 and 3 read taps left of the ROI; flat data stays flat.
    assert_eq!(out.get(3, 3, 0), Some(90));
    assert_eq!(out.get(4, 3, 0), Some(90));
}

#[test]
fn test_roi_and_no_data_range_combine() {
    let bounds = Rect::new(0, 0, 24, 24);
    let mut src = pattern::<u16>(bounds, 1, |x, y, _| (100 + x * 29 + y * 11) as f64);
    src.pixel_mut(3, 3)[0] = 0;
    let no_data_sample = Rect::new(3, 3, 1, 1);
    let hole = Rect::new(8, 8, 6, 6);
    let roi = Roi::mask(RoiMask::from_fn(bounds, |x, y| !hole.contains(x, y)));
    let range = NoDataRange::point(0.0);
    // Union of every kernel's taps for a pixel under the identity map.
    let support_touches = |area: Rect, x: i64, y: i64| {
        !Rect::new(x - 1, y - 1, 4, 4).intersection(&area).is_empty()
    };

    for interpolation in KERNELS {
        let warp_with = |roi: Option<Roi>, range: Option<NoDataRange>| {
            let mut config = WarpConfig::new();
            config
                .set_interpolation(interpolation)
                .set_roi(roi)
                .set_no_data_range(range)
                .set_destination_no_data(&[65535.0]);
            OpAffineWarp::new(AffineMap::identity(), config)
                .expect("valid warp")
                .apply(&src, bounds)
        };
        let both = warp_with(Some(roi.clone()), Some(range));
        let roi_only = warp_with(Some(roi.clone()), None);
        let no_data_only = warp_with(None, Some(range));

        assert_eq!(both.get(11, 11, 0), Some(65535), "{interpolation}");
        assert_eq!(both.get(10, 12, 0), Some(65535), "{interpolation}");

        let at_sample = both.get(3, 3, 0);
        if interpolation == Interpolation::Nearest {
            assert_eq!(at_sample, Some(65535));
        } else {
            assert!(
                at_sample.is_some_and(|v| (100..=1020).contains(&v)),
                "{interpolation}: {at_sample:?}"
            );
        }

        for y in 0..24 {
            for x in 0..24 {
                let got = both.get(x, y, 0);
                if !support_touches(no_data_sample, x, y) {
                    assert_eq!(got, roi_only.get(x, y, 0), "{interpolation} ({x}, {y})");
                }
                if !support_touches(hole, x, y) {
                    assert_eq!(got, no_data_only.get(x, y, 0), "{interpolation} ({x}, {y})");
                }
            }
        }
    }
}

#[test]
fn test_large_origin_samples_projected_column() {
    let src_bounds = Rect::new(1_000_000, 2_000_000, 200, 3);
    let map = AffineMap::scale(3.0, 1.0).expect("scale");
    let dst_rect = Rect::new(3_000_030, 2_000_001, 300, 1);

    let src = pattern::<i32>(src_bounds, 1, |x, _, _| (1_000_000 + x) as f64);
    let out = warp(map, Interpolation::Nearest).apply(&src, dst_rect);
    for dx in dst_rect.x..dst_rect.max_x() {
        let expected = (2 * dx + 1).div_euclid(6) as i32;
        assert_eq!(out.get(dx, dst_rect.y, 0), Some(expected), "column {dx}");
    }

    let src = pattern::<f64>(src_bounds, 1, |x, _, _| (1_000_000 + x) as f64);
    let out = warp(map, Interpolation::Bilinear).apply(&src, dst_rect);
    for dx in dst_rect.x..dst_rect.max_x() {
        let got = out.get(dx, dst_rect.y, 0).expect("inside raster");
        assert_abs_diff_eq!(got, (dx as f64 + 0.5) / 3.0 - 0.5, epsilon = 1e-3);
    }
}

#[test]
fn test_nan_samples_are_no_data() {
    let bounds = Rect::new(0, 0, 6, 6);
    let mut src = Raster::<f32>::filled(bounds, 1, &[5.0]);
    src.pixel_mut(2, 2)[0] = f32::NAN;

    let mut config = WarpConfig::new();
    config
        .set_no_data_range(Some(NoDataRange::point(-9999.0)))
        .set_destination_no_data(&[-9999.0]);
    let nearest = OpAffineWarp::new(AffineMap::identity(), config.clone()).expect("valid warp");
    let out = nearest.apply(&src, bounds);
    assert_eq!(out.get(2, 2, 0), Some(-9999.0));
    assert_eq!(out.get(3, 2, 0), Some(5.0));

    config.set_interpolation(Interpolation::Bicubic);
    let bicubic = OpAffineWarp::new(AffineMap::identity(), config).expect("valid warp");
    let out = bicubic.apply(&src, bounds);
    assert_eq!(out.get(2, 2, 0), Some(5.0));
}

#[test]
fn test_without_no_data_range_nan_propagates() {
    let bounds = Rect::new(0, 0, 4, 4);
    let mut src = Raster::<f64>::filled(bounds, 1, &[1.0]);
    src.pixel_mut(1, 1)[0] = f64::NAN;
    let out = warp(AffineMap::translation(0.5, 0.0).expect("shift"), Interpolation::Bilinear)
        .apply(&src, bounds);
    assert!(out.get(1, 1, 0).is_some_and(f64::is_nan));
}

#[test]
fn test_integer_results_track_float_reference() {
    const OUTSIDE: f64 = -1.0e9;
    let bounds = Rect::new(0, 0, 24, 24);
    let value = |x: usize, y: usize, _b: usize| if (x / 4 + y / 6) % 2 == 0 { 0.0 } else { 255.0 };
    let bytes = pattern::<u8>(bounds, 1, value);
    let shorts = pattern::<i16>(bounds, 1, |x, y, b| value(x, y, b) * 128.0 - 16384.0);
    let reference = pattern::<f64>(bounds, 1, value);

    let mut config = WarpConfig::new();
    config
        .set_interpolation(Interpolation::Bicubic)
        .set_cubic_parameter(-1.0)
        .set_destination_no_data(&[OUTSIDE]);
    let map = AffineMap::rotation_about(0.4, 12.0, 12.0)
        .and_then(|m| m.then(&AffineMap::scale(1.3, 1.3)?))
        .expect("map");
    let op = OpAffineWarp::new(map, config).expect("valid warp");
    let dst_rect = op.destination_bounds(bounds);

    let bytes = op.apply(&bytes, dst_rect);
    let shorts = op.apply(&shorts, dst_rect);
    let reference = op.apply(&reference, dst_rect);

    let mut saw_overshoot = false;
    for ((&b, &s), &r) in bytes.data().iter().zip(shorts.data()).zip(reference.data()) {
        if r == OUTSIDE {
            continue;
        }
        if !(0.0..=255.0).contains(&r) {
            saw_overshoot = true;
        }
        assert_abs_diff_eq!(b as f64, r.clamp(0.0, 255.0), epsilon = 8.0);
        assert_abs_diff_eq!(s as f64, r * 128.0 - 16384.0, epsilon = 8.0 * 128.0);
    }
    assert!(saw_overshoot);
}

#[test]
fn test_int_destination_wraps_instead_of_clamping() {
    let bounds = Rect::new(0, 0, 4, 4);
    let map = AffineMap::translation(-0.5, 0.0).expect("shift");
    let mut config = WarpConfig::new();
    config.set_interpolation(Interpolation::Bicubic);
    let op = OpAffineWarp::new(map, config).expect("valid warp");

    // Halfway between two maxima next to a zero, the kernel overshoots by 1/16.
    let ints = Raster::from_vec(bounds, 1, [0, i32::MAX, i32::MAX, i32::MAX].repeat(4))
        .expect("valid raster");
    let mut out = Raster::new(Rect::new(1, 1, 1, 1), 1);
    op.compute_tile(&ints, &mut out);
    let overshoot = (i32::MAX as i64 * 272 + 128) >> 8;
    assert_eq!(out.data(), &[overshoot as i32]);
    assert!(out.data()[0] < 0);

    let ushorts = Raster::from_vec(bounds, 1, [0, u16::MAX, u16::MAX, u16::MAX].repeat(4))
        .expect("valid raster");
    let mut out = Raster::new(Rect::new(1, 1, 1, 1), 1);
    op.compute_tile(&ushorts, &mut out);
    assert_eq!(out.data(), &[u16::MAX]);
}

#[test]
fn test_translation_clips_one_side() {
    let src = Raster::<u16>::filled(Rect::new(0, 0, 10, 3), 1, &[1]);
    let mut config = WarpConfig::new();
    config.set_destination_no_data(&[0.0]);
    let op = OpAffineWarp::new(AffineMap::translation(3.0, 0.0).expect("shift"), config)
        .expect("valid warp");
    let out = op.apply(&src, Rect::new(0, 0, 10, 1));
    assert_eq!(out.data(), &[0, 0, 0, 1, 1, 1, 1, 1, 1, 1]);
}

#[test]
fn test_round_trip_nearest_within_one_pixel() {
    let bounds = Rect::new(0, 0, 40, 40);
    let src = pattern::<u16>(bounds, 1, |x, y, _| (y * 64 + x) as f64);
    let map = AffineMap::rotation_about(0.3, 20.0, 20.0).expect("rotation");

    let mut config = WarpConfig::new();
    config.set_destination_no_data(&[u16::MAX as f64]);
    let forward = OpAffineWarp::new(map, config.clone()).expect("valid warp");
    let backward = OpAffineWarp::new(map.inverted(), config).expect("valid warp");

    let warped = forward.apply(&src, forward.destination_bounds(bounds));
    let restored = backward.apply(&warped, bounds);

    let mut checked = 0;
    for y in 0..40 {
        for x in 0..40 {
            let v = restored.pixel(x, y)[0];
            if v == u16::MAX {
                continue;
            }
            let (vx, vy) = ((v % 64) as i64, (v / 64) as i64);
            assert!((vx - x as i64).abs() <= 1, "x drift at ({x}, {y}): {vx}");
            assert!((vy - y as i64).abs() <= 1, "y drift at ({x}, {y}): {vy}");
            checked += 1;
        }
    }
    assert!(checked > 1000);
}

#[test]
fn test_operator_is_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OpAffineWarp>();

    let bounds = Rect::new(0, 0, 96, 96);
    let src = pattern::<u8>(bounds, 3, |x, y, b| ((x ^ y) + b * 40) as f64);
    let mut config = WarpConfig::new();
    config
        .set_interpolation(Interpolation::Bicubic)
        .set_no_data_range(Some(NoDataRange::point(0.0)));
    let op = OpAffineWarp::new(
        AffineMap::rotation_about(-0.6, 48.0, 48.0).expect("rotation"),
        config,
    )
    .expect("valid warp");
    let expected = op.apply(&src, bounds);

    let tiles: Vec<Rect> = bounds.tiles(32).collect();
    let painted: Vec<Raster<u8>> = thread::scope(|scope| {
        let handles: Vec<_> = tiles
            .iter()
            .map(|&rect| {
                let (op, src) = (&op, &src);
                scope.spawn(move || {
                    let mut scratch = WarpScratch::new();
                    let mut tile = Raster::new(rect, 3);
                    op.compute_tile_with_scratch(src, &mut tile, &mut scratch);
                    tile
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker finished"))
            .collect()
    });

    let mut assembled = Raster::new(bounds, 3);
    for tile in &painted {
        assembled.blit(tile);
    }
    assert_eq!(assembled, expected);
}

fn brute_force_clip(
    walker: &GeometryWalker,
    dst_x: i64,
    dst_y: i64,
    count: usize,
    support: Rect,
) -> Vec<usize> {
    let mut cursor = walker.row(dst_x, dst_y);
    let mut inside = Vec::new();
    for k in 0..count {
        let p = cursor.pos();
        if support.contains(p.x.int, p.y.int) {
            inside.push(k);
        }
        cursor.advance();
    }
    inside
}

proptest! {
    #[test]
    fn prop_clip_agrees_with_walk(
        angle in -3.2f64..3.2,
        scale in 0.3f64..3.0,
        tx in -20.0f64..20.0,
        ty in -20.0f64..20.0,
        dst_x in -30i64..30,
        dst_y in -30i64..30,
        count in 0usize..80,
        sx in -5i64..5,
        sy in -5i64..5,
        sw in 0usize..30,
        sh in 0usize..30,
    ) {
        let map = AffineMap::rotation(angle)
            .and_then(|m| m.then(&AffineMap::new([scale, 0.0, tx, 0.0, scale, ty])?))
            .expect("invertible");
        let walker = GeometryWalker::new(&map, 0.5);
        let support = Rect::new(sx, sy, sw, sh);
        let start = walker.row(dst_x, dst_y).pos();
        let clipped: Vec<usize> = walker
            .clip(start, count, support)
            .map(|r| r.collect())
            .unwrap_or_default();
        prop_assert_eq!(clipped, brute_force_clip(&walker, dst_x, dst_y, count, support));
    }

    #[test]
    fn prop_translation_shortens_one_side(
        width in 8usize..40,
        whole in 1i64..12,
        part in 0.0f64..1.0,
        negative in any::<bool>(),
        kernel in 0usize..3,
    ) {
        let interpolation = KERNELS[kernel];
        let tx = if negative { -(whole as f64 + part) } else { whole as f64 + part };
        let map = AffineMap::translation(tx, 0.0).expect("shift");
        let walker = GeometryWalker::new(&map, interpolation.origin_shift());
        let support = interpolation.anchor_support(Rect::new(0, 0, width, 8));
        let count = support.width;
        let start = walker.row(support.x, 3).pos();

        if let Some(range) = walker.clip(start, count, support) {
            if negative {
                prop_assert_eq!(range.start, 0);
                prop_assert!(range.end < count);
            } else {
                prop_assert!(range.start > 0);
                prop_assert_eq!(range.end, count);
            }
        } else {
            prop_assert!(whole as usize + 1 >= count);
        }
    }

    #[test]
    fn prop_inpainting_keeps_valid_taps(
        taps in prop::array::uniform4(-1000i64..1000),
        valid in prop::array::uniform4(any::<bool>()),
    ) {
        let out = inpaint(taps, valid);
        let kept: Vec<i64> = (0..4).filter(|&i| valid[i]).map(|i| taps[i]).collect();
        if kept.is_empty() {
            prop_assert_eq!(out, [0; 4]);
        } else {
            let lo = *kept.iter().min().expect("non-empty");
            let hi = *kept.iter().max().expect("non-empty");
            for i in 0..4 {
                if valid[i] {
                    prop_assert_eq!(out[i], taps[i]);
                }
                prop_assert!(out[i] >= lo && out[i] <= hi);
            }
        }
    }
}
