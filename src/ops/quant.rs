//! Quantization parameters.
//!
//! [`QuantParams`] is the caller-facing tagged union. The variants in
//! `ops::variants` validate it once against their precision and keep only
//! the fields they need.

use crate::dtype::Precision;
use crate::error::{Error, Result};

/// Quantization parameters of one convolution call.
///
/// Zero points are true zero points: a stored value `q` represents
/// `scale * (q - zero_point)`. Multipliers are Q31 fixed point and
/// shifts are signed powers of two, so the real scale of a pair is
/// `multiplier * 2^(shift - 31)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantParams<'a> {
    /// Float arithmetic, no requantization.
    #[default]
    None,
    /// Power-of-two fixed point (8x8 and 16x16).
    Fixed {
        /// Shift applied to the accumulator before narrowing.
        acc_shift: i32,
        /// Shift applied to the bias before it joins the accumulator.
        bias_shift: i32,
    },
    /// One scale for the whole tensor, zero points on every operand.
    Asymmetric {
        /// Input zero point.
        input_zero_point: i32,
        /// Kernel zero point.
        kernel_zero_point: i32,
        /// Output zero point.
        output_zero_point: i32,
        /// Q31 output multiplier.
        multiplier: i32,
        /// Output shift.
        shift: i32,
    },
    /// One scale per output channel, symmetric kernel.
    PerChannel {
        /// Input zero point.
        input_zero_point: i32,
        /// Output zero point.
        output_zero_point: i32,
        /// One Q31 multiplier per output channel.
        multipliers: &'a [i32],
        /// One shift per output channel.
        shifts: &'a [i32],
    },
    /// One scale per output channel, symmetric 16-bit activations.
    Symmetric16 {
        /// One Q31 multiplier per output channel.
        multipliers: &'a [i32],
        /// One shift per output channel.
        shifts: &'a [i32],
    },
}

impl QuantParams<'_> {
    /// Name of the tag for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            QuantParams::None => "none",
            QuantParams::Fixed { .. } => "fixed",
            QuantParams::Asymmetric { .. } => "asymmetric",
            QuantParams::PerChannel { .. } => "per_channel",
            QuantParams::Symmetric16 { .. } => "symmetric16",
        }
    }

    /// The tag each precision expects.
    pub fn expected_for(precision: Precision) -> &'static str {
        match precision {
            Precision::F32 => "none",
            Precision::Fixed8 | Precision::Fixed16 => "fixed",
            Precision::Asym8 => "asymmetric",
            Precision::PerChannelSym8 => "per_channel",
            Precision::Sym8Sym16 => "symmetric16",
        }
    }
}

/// Check that a signed shift lies in `[min, max]`.
pub(crate) fn check_shift(precision: Precision, name: &str, shift: i32, min: i32, max: i32) -> Result<()> {
    if shift < min || shift > max {
        return Err(Error::quant(
            precision,
            format!("{} {} out of range [{}, {}]", name, shift, min, max),
        ));
    }
    Ok(())
}

/// Check that a zero point is representable in the 8-bit signed range.
pub(crate) fn check_zero_point(precision: Precision, name: &str, zero_point: i32) -> Result<()> {
    if !(i8::MIN as i32..=i8::MAX as i32).contains(&zero_point) {
        return Err(Error::quant(
            precision,
            format!("{} {} outside [-128, 127]", name, zero_point),
        ));
    }
    Ok(())
}

/// Check that a Q31 multiplier is non-negative.
pub(crate) fn check_multiplier(precision: Precision, multiplier: i32) -> Result<()> {
    if multiplier < 0 {
        return Err(Error::quant(
            precision,
            format!("multiplier {} must be >= 0", multiplier),
        ));
    }
    Ok(())
}

/// Convert a positive real scale into a Q31 `(multiplier, shift)` pair with
/// `scale == multiplier * 2^(shift - 31)`.
///
/// The multiplier lies in `[2^30, 2^31)`. Scales too small to represent
/// with a shift of at least `-31` quantize to `(0, 0)`.
pub fn quantize_multiplier(real_scale: f64) -> Result<(i32, i32)> {
    if !real_scale.is_finite() || real_scale < 0.0 {
        return Err(Error::invalid(
            "real_scale",
            format!("must be finite and non-negative, got {}", real_scale),
        ));
    }
    if real_scale == 0.0 {
        return Ok((0, 0));
    }

    // frexp: real_scale = q * 2^shift with q in [0.5, 1)
    let mut q = real_scale;
    let mut shift = 0i32;
    while q >= 1.0 {
        q *= 0.5;
        shift += 1;
    }
    while q < 0.5 {
        q *= 2.0;
        shift -= 1;
    }

    let mut q_fixed = (q * (1i64 << 31) as f64).round() as i64;
    if q_fixed == 1i64 << 31 {
        q_fixed /= 2;
        shift += 1;
    }
    if shift < -31 {
        return Ok((0, 0));
    }
    if shift > 31 {
        return Err(Error::invalid(
            "real_scale",
            format!("{} is too large for a Q31 multiplier", real_scale),
        ));
    }
    Ok((q_fixed as i32, shift))
}
