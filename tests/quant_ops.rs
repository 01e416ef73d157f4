//! Requantization arithmetic properties.

use dwconv::ops::{quantize_multiplier, DepthwiseVariant, PerChannelSym8Variant, QuantParams};
use dwconv::runtime::cpu::kernels::requant::{
    multiply_by_quantized_multiplier, multiply_by_quantized_multiplier_reduced,
    rounding_divide_by_pot, saturating_rounding_doubling_high_mul, shift_round,
};
use proptest::prelude::*;

#[test]
fn test_ties_round_away_from_zero() {
    assert_eq!(rounding_divide_by_pot(5, 1), 3);
    assert_eq!(rounding_divide_by_pot(-5, 1), -3);
    assert_eq!(rounding_divide_by_pot(-4, 1), -2);
    assert_eq!(shift_round(-6, -2), -2);
    assert_eq!(shift_round(6, -2), 2);
    assert_eq!(shift_round(3, 4), 48);
    // 11 * 0.5 = 5.5
    assert_eq!(saturating_rounding_doubling_high_mul(11, 1 << 30), 6);
    assert_eq!(saturating_rounding_doubling_high_mul(-11, 1 << 30), -6);
    assert_eq!(
        saturating_rounding_doubling_high_mul(i32::MIN, i32::MIN),
        i32::MAX
    );
}

#[test]
fn test_left_shift_saturates() {
    let (m, s) = quantize_multiplier(4.0).unwrap();
    assert_eq!(s, 3);
    // x << 3 saturates before the high multiply halves it.
    assert_eq!(multiply_by_quantized_multiplier(i32::MAX / 2, m, s), 1 << 30);
    assert_eq!(multiply_by_quantized_multiplier(i32::MIN / 2, m, s), -(1 << 30));
    assert_eq!(multiply_by_quantized_multiplier(1000, m, s), 4000);
}

#[test]
fn test_quantize_multiplier_rejects_bad_scales() {
    assert!(quantize_multiplier(-1.0).is_err());
    assert!(quantize_multiplier(f64::NAN).is_err());
    assert!(quantize_multiplier(1e12).is_err());
    assert_eq!(quantize_multiplier(1e-12).unwrap(), (0, 0));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn prop_requant_tracks_real_scale(scale in 1e-4f64..8.0, x in -1_000_000i32..1_000_000) {
        let (m, s) = quantize_multiplier(scale).unwrap();
        let got = multiply_by_quantized_multiplier(x, m, s) as f64;
        let want = x as f64 * scale;
        prop_assert!((got - want).abs() <= 1.0, "x={} scale={} got={} want={}", x, scale, got, want);
    }

    #[test]
    fn prop_requant_is_odd(scale in 1e-4f64..1.0, x in -i32::MAX..i32::MAX) {
        let (m, s) = quantize_multiplier(scale).unwrap();
        prop_assert_eq!(
            multiply_by_quantized_multiplier(-x, m, s),
            -multiply_by_quantized_multiplier(x, m, s)
        );
    }

    #[test]
    fn prop_reduced_close_to_exact(
        acc in -(1i64 << 40)..(1i64 << 40),
        multiplier in (1i32 << 30)..i32::MAX,
        shift in -24i32..=0,
    ) {
        let got = multiply_by_quantized_multiplier_reduced(acc, multiplier, shift) as f64;
        let exact = acc as f64 * multiplier as f64 * 2f64.powi(shift - 31);
        prop_assert!(
            (got - exact).abs() <= 1.0 + exact.abs() * 2f64.powi(-14),
            "acc={} m={} shift={} got={} exact={}", acc, multiplier, shift, got, exact
        );
    }

    #[test]
    fn prop_per_channel_round_trip(
        scales in (1e-6f64..0.5, 1e-6f64..0.5),
        acc in -(1i64 << 33)..(1i64 << 33),
        output_zero_point in -20i32..20,
        channel in 0usize..2,
    ) {
        let (m0, s0) = quantize_multiplier(scales.0).unwrap();
        let (m1, s1) = quantize_multiplier(scales.1).unwrap();
        let multipliers = [m0, m1];
        let shifts = [s0, s1];
        let variant = PerChannelSym8Variant::from_quant(&QuantParams::PerChannel {
            input_zero_point: 0,
            output_zero_point,
            multipliers: &multipliers,
            shifts: &shifts,
        })
        .unwrap();
        let scale = if channel == 0 { scales.0 } else { scales.1 };

        let q = variant.finish(acc, None, channel) as i32;
        let real = acc.clamp(i32::MIN as i64, i32::MAX as i64) as f64 * scale
            + output_zero_point as f64;
        if q == i8::MAX as i32 {
            prop_assert!(real >= 126.0, "saturated high from {}", real);
        } else if q == i8::MIN as i32 {
            prop_assert!(real <= -127.0, "saturated low from {}", real);
        } else {
            // Dequantized value is within one step of the accumulator.
            let dequantized = (q - output_zero_point) as f64 / scale;
            prop_assert!(
                (dequantized - acc as f64).abs() <= 1.0 / scale,
                "acc={} q={} scale={}", acc, q, scale
            );
        }
    }
}
