//! Fixed-point requantization primitives
//!
//! All right shifts round half away from zero; all narrowing saturates.
//! The asymmetric helpers use gemmlowp-style fixed point: a Q31 multiplier
//! in `[0, 2^31)` and a signed power-of-two exponent. Unlike gemmlowp, the
//! doubling high multiply also rounds negative ties away from zero.

/// Shift `value` by `shift` bits: left (saturating) when positive, right
/// with round-half-away-from-zero when negative.
///
/// Shift magnitudes beyond 62 are clamped to 62.
#[inline]
pub fn shift_round(value: i64, shift: i32) -> i64 {
    if shift >= 0 {
        let n = shift.min(62) as u32;
        let wide = (value as i128) << n;
        wide.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    } else {
        let n = (-(shift as i64)).min(62) as u32;
        let half = 1i128 << (n - 1);
        let v = value as i128;
        let r = if v >= 0 {
            (v + half) >> n
        } else {
            -((-v + half) >> n)
        };
        r as i64
    }
}

/// `round(a * b / 2^31)` with rounding half away from zero, saturating the
/// single overflow case `a == b == i32::MIN`.
#[inline]
pub fn saturating_rounding_doubling_high_mul(a: i32, b: i32) -> i32 {
    if a == i32::MIN && b == i32::MIN {
        return i32::MAX;
    }
    let ab = a as i64 * b as i64;
    let nudge: i64 = if ab >= 0 { 1 << 30 } else { -(1 << 30) };
    ((ab + nudge) / (1i64 << 31)) as i32
}

/// `round(x / 2^exponent)` with rounding half away from zero.
#[inline]
pub fn rounding_divide_by_pot(x: i32, exponent: i32) -> i32 {
    debug_assert!((0..=31).contains(&exponent));
    if exponent <= 0 {
        return x;
    }
    let mask: i64 = (1i64 << exponent) - 1;
    let x = x as i64;
    let remainder = x & mask;
    let threshold = (mask >> 1) + i64::from(x < 0);
    ((x >> exponent) + i64::from(remainder > threshold)) as i32
}

/// Scale `x` by the real factor `multiplier * 2^(shift - 31)`.
///
/// A positive `shift` is applied as a saturating left shift before the
/// high multiply; a negative one as a rounding right shift after it.
#[inline]
pub fn multiply_by_quantized_multiplier(x: i32, multiplier: i32, shift: i32) -> i32 {
    let left = shift.max(0);
    let right = (-shift).max(0);
    let shifted = ((x as i64) << left.min(32)).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    rounding_divide_by_pot(
        saturating_rounding_doubling_high_mul(shifted, multiplier),
        right.min(31),
    )
}

/// Largest accumulator magnitude accepted by the reduced-multiplier path.
pub const REDUCED_ACC_LIMIT: i64 = 1 << 47;

/// Q31 multiplier reduced to Q15, rounded, capped at `0x7FFF`.
#[inline]
pub fn reduce_multiplier(multiplier: i32) -> i64 {
    ((multiplier as i64 + (1 << 15)) >> 16).min(0x7FFF)
}

/// Scale a 64-bit accumulator by `multiplier * 2^(shift - 31)` through a
/// 16-bit reduced multiplier.
///
/// The accumulator is clamped to `±2^47` first, so the product with the
/// reduced multiplier never exceeds 62 bits.
#[inline]
pub fn multiply_by_quantized_multiplier_reduced(acc: i64, multiplier: i32, shift: i32) -> i64 {
    let acc = acc.clamp(-REDUCED_ACC_LIMIT, REDUCED_ACC_LIMIT);
    let product = acc * reduce_multiplier(multiplier);
    shift_round(product, shift - 15)
}
