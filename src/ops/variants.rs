//! One [`DepthwiseVariant`] per supported precision.

use crate::dtype::{Fixed, Precision};
use crate::error::{Error, Result};
use crate::ops::quant::{check_multiplier, check_shift, check_zero_point};
use crate::ops::{DepthwiseVariant, QuantParams};
use crate::runtime::cpu::kernels::requant::{
    multiply_by_quantized_multiplier, multiply_by_quantized_multiplier_reduced, shift_round,
};
use std::marker::PhantomData;

fn mismatch(precision: Precision, got: &QuantParams<'_>) -> Error {
    Error::quant(
        precision,
        format!(
            "expected {} parameters, got {}",
            QuantParams::expected_for(precision),
            got.name()
        ),
    )
}

fn check_activation(precision: Precision, min: i32, max: i32) -> Result<()> {
    if min > max {
        return Err(Error::quant(
            precision,
            format!("activation range [{}, {}] is empty", min, max),
        ));
    }
    Ok(())
}

fn check_per_channel(
    precision: Precision,
    multipliers: &[i32],
    shifts: &[i32],
    shift_min: i32,
    shift_max: i32,
) -> Result<()> {
    if multipliers.len() != shifts.len() {
        return Err(Error::quant(
            precision,
            format!(
                "{} multipliers but {} shifts",
                multipliers.len(),
                shifts.len()
            ),
        ));
    }
    for (&m, &s) in multipliers.iter().zip(shifts) {
        check_multiplier(precision, m)?;
        check_shift(precision, "shift", s, shift_min, shift_max)?;
    }
    Ok(())
}

fn check_channel_count(precision: Precision, len: usize, out_channels: usize) -> Result<()> {
    if len != out_channels {
        return Err(Error::quant(
            precision,
            format!(
                "per-channel arrays have {} entries, output has {} channels",
                len, out_channels
            ),
        ));
    }
    Ok(())
}

// ============================================================================
// Float
// ============================================================================

/// 32-bit float arithmetic. Output is `acc + bias`, unclamped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct F32Variant;

impl F32Variant {
    /// Accepts only [`QuantParams::None`].
    pub fn from_quant(quant: &QuantParams<'_>) -> Result<Self> {
        match quant {
            QuantParams::None => Ok(F32Variant),
            other => Err(mismatch(Precision::F32, other)),
        }
    }
}

impl DepthwiseVariant for F32Variant {
    const PRECISION: Precision = Precision::F32;
    type Input = f32;
    type Kernel = f32;
    type Bias = f32;
    type Output = f32;
    type Acc = f32;

    #[inline]
    fn input_pad(&self) -> f32 {
        0.0
    }

    #[inline]
    fn kernel_pad(&self) -> f32 {
        0.0
    }

    #[inline(always)]
    fn mac(&self, acc: f32, x: f32, k: f32) -> f32 {
        acc + x * k
    }

    #[inline]
    fn finish(&self, acc: f32, bias: Option<f32>, _channel: usize) -> f32 {
        match bias {
            Some(b) => acc + b,
            None => acc,
        }
    }
}

// ============================================================================
// Power-of-two fixed point
// ============================================================================

/// 8x8 or 16x16 fixed point with global shifts.
///
/// `out = sat(shift(acc + shift(bias, bias_shift), acc_shift))` where a
/// positive shift moves left and a negative one rounds right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPoint<T> {
    acc_shift: i32,
    bias_shift: i32,
    _marker: PhantomData<T>,
}

/// Largest shift magnitude accepted by the fixed-point variants.
pub const FIXED_SHIFT_LIMIT: i32 = 31;

impl<T: Fixed> FixedPoint<T> {
    fn build(precision: Precision, quant: &QuantParams<'_>) -> Result<Self> {
        match *quant {
            QuantParams::Fixed {
                acc_shift,
                bias_shift,
            } => {
                check_shift(precision, "acc_shift", acc_shift, -FIXED_SHIFT_LIMIT, FIXED_SHIFT_LIMIT)?;
                check_shift(precision, "bias_shift", bias_shift, -FIXED_SHIFT_LIMIT, FIXED_SHIFT_LIMIT)?;
                Ok(Self {
                    acc_shift,
                    bias_shift,
                    _marker: PhantomData,
                })
            }
            ref other => Err(mismatch(precision, other)),
        }
    }

    #[inline]
    fn requantize(&self, acc: i64, bias: Option<T>) -> T {
        let acc = match bias {
            Some(b) => acc.saturating_add(shift_round(b.to_i64(), self.bias_shift)),
            None => acc,
        };
        T::saturate_from(shift_round(acc, self.acc_shift))
    }
}

macro_rules! impl_fixed_variant {
    ($t:ty, $precision:expr) => {
        impl FixedPoint<$t> {
            /// Accepts only [`QuantParams::Fixed`] with shifts in `[-31, 31]`.
            pub fn from_quant(quant: &QuantParams<'_>) -> Result<Self> {
                Self::build($precision, quant)
            }
        }

        impl DepthwiseVariant for FixedPoint<$t> {
            const PRECISION: Precision = $precision;
            type Input = $t;
            type Kernel = $t;
            type Bias = $t;
            type Output = $t;
            type Acc = i64;

            #[inline]
            fn input_pad(&self) -> $t {
                0
            }

            #[inline]
            fn kernel_pad(&self) -> $t {
                0
            }

            #[inline(always)]
            fn mac(&self, acc: i64, x: $t, k: $t) -> i64 {
                acc + x as i64 * k as i64
            }

            #[inline]
            fn finish(&self, acc: i64, bias: Option<$t>, _channel: usize) -> $t {
                self.requantize(acc, bias)
            }
        }
    };
}

impl_fixed_variant!(i8, Precision::Fixed8);
impl_fixed_variant!(i16, Precision::Fixed16);

/// 8-bit fixed point.
pub type Fixed8Variant = FixedPoint<i8>;
/// 16-bit fixed point.
pub type Fixed16Variant = FixedPoint<i16>;

// ============================================================================
// Asymmetric 8-bit
// ============================================================================

/// Asymmetric signed 8-bit with a single output scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asym8Variant {
    input_zero_point: i32,
    kernel_zero_point: i32,
    output_zero_point: i32,
    multiplier: i32,
    shift: i32,
    activation_min: i8,
    activation_max: i8,
}

impl Asym8Variant {
    /// Accepts only [`QuantParams::Asymmetric`] with 8-bit zero points,
    /// a non-negative multiplier and a shift in `[-31, 31]`.
    pub fn from_quant(quant: &QuantParams<'_>) -> Result<Self> {
        let p = Precision::Asym8;
        match *quant {
            QuantParams::Asymmetric {
                input_zero_point,
                kernel_zero_point,
                output_zero_point,
                multiplier,
                shift,
            } => {
                check_zero_point(p, "input_zero_point", input_zero_point)?;
                check_zero_point(p, "kernel_zero_point", kernel_zero_point)?;
                check_zero_point(p, "output_zero_point", output_zero_point)?;
                check_multiplier(p, multiplier)?;
                check_shift(p, "shift", shift, -31, 31)?;
                Ok(Self {
                    input_zero_point,
                    kernel_zero_point,
                    output_zero_point,
                    multiplier,
                    shift,
                    activation_min: i8::MIN,
                    activation_max: i8::MAX,
                })
            }
            ref other => Err(mismatch(p, other)),
        }
    }

    /// Clamp outputs to `[min, max]` (fused activation).
    pub fn with_activation(mut self, min: i8, max: i8) -> Result<Self> {
        check_activation(Self::PRECISION, min as i32, max as i32)?;
        self.activation_min = min;
        self.activation_max = max;
        Ok(self)
    }
}

impl DepthwiseVariant for Asym8Variant {
    const PRECISION: Precision = Precision::Asym8;
    type Input = i8;
    type Kernel = i8;
    type Bias = i32;
    type Output = i8;
    type Acc = i64;

    #[inline]
    fn input_pad(&self) -> i8 {
        self.input_zero_point as i8
    }

    #[inline]
    fn kernel_pad(&self) -> i8 {
        self.kernel_zero_point as i8
    }

    #[inline(always)]
    fn mac(&self, acc: i64, x: i8, k: i8) -> i64 {
        acc + (x as i64 - self.input_zero_point as i64) * (k as i64 - self.kernel_zero_point as i64)
    }

    #[inline]
    fn finish(&self, acc: i64, bias: Option<i32>, _channel: usize) -> i8 {
        requantize_asym(
            acc,
            bias,
            self.multiplier,
            self.shift,
            self.output_zero_point,
            self.activation_min,
            self.activation_max,
        )
    }
}

#[inline]
fn requantize_asym(
    acc: i64,
    bias: Option<i32>,
    multiplier: i32,
    shift: i32,
    output_zero_point: i32,
    min: i8,
    max: i8,
) -> i8 {
    let acc = acc + bias.map_or(0, i64::from);
    let acc = acc.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    let scaled = multiply_by_quantized_multiplier(acc, multiplier, shift) as i64;
    (scaled + output_zero_point as i64).clamp(min as i64, max as i64) as i8
}

// ============================================================================
// Per-channel symmetric 8-bit kernel
// ============================================================================

/// Symmetric 8-bit kernel, asymmetric 8-bit activations, one scale per
/// output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerChannelSym8Variant<'a> {
    input_zero_point: i32,
    output_zero_point: i32,
    multipliers: &'a [i32],
    shifts: &'a [i32],
    activation_min: i8,
    activation_max: i8,
}

impl<'a> PerChannelSym8Variant<'a> {
    /// Accepts only [`QuantParams::PerChannel`].
    pub fn from_quant(quant: &QuantParams<'a>) -> Result<Self> {
        let p = Precision::PerChannelSym8;
        match *quant {
            QuantParams::PerChannel {
                input_zero_point,
                output_zero_point,
                multipliers,
                shifts,
            } => {
                check_zero_point(p, "input_zero_point", input_zero_point)?;
                check_zero_point(p, "output_zero_point", output_zero_point)?;
                check_per_channel(p, multipliers, shifts, -31, 31)?;
                Ok(Self {
                    input_zero_point,
                    output_zero_point,
                    multipliers,
                    shifts,
                    activation_min: i8::MIN,
                    activation_max: i8::MAX,
                })
            }
            ref other => Err(mismatch(p, other)),
        }
    }

    /// Clamp outputs to `[min, max]` (fused activation).
    pub fn with_activation(mut self, min: i8, max: i8) -> Result<Self> {
        check_activation(Self::PRECISION, min as i32, max as i32)?;
        self.activation_min = min;
        self.activation_max = max;
        Ok(self)
    }
}

impl DepthwiseVariant for PerChannelSym8Variant<'_> {
    const PRECISION: Precision = Precision::PerChannelSym8;
    type Input = i8;
    type Kernel = i8;
    type Bias = i32;
    type Output = i8;
    type Acc = i64;

    #[inline]
    fn input_pad(&self) -> i8 {
        self.input_zero_point as i8
    }

    #[inline]
    fn kernel_pad(&self) -> i8 {
        0
    }

    #[inline(always)]
    fn mac(&self, acc: i64, x: i8, k: i8) -> i64 {
        acc + (x as i64 - self.input_zero_point as i64) * k as i64
    }

    #[inline]
    fn finish(&self, acc: i64, bias: Option<i32>, channel: usize) -> i8 {
        requantize_asym(
            acc,
            bias,
            self.multipliers[channel],
            self.shifts[channel],
            self.output_zero_point,
            self.activation_min,
            self.activation_max,
        )
    }

    fn check_channels(&self, out_channels: usize) -> Result<()> {
        check_channel_count(Self::PRECISION, self.multipliers.len(), out_channels)
    }
}

// ============================================================================
// Symmetric 8-bit kernel x symmetric 16-bit activations
// ============================================================================

/// Symmetric 8-bit kernel, symmetric 16-bit activations, 64-bit bias, one
/// scale per output channel applied through a reduced 16-bit multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sym8Sym16Variant<'a> {
    multipliers: &'a [i32],
    shifts: &'a [i32],
}

impl<'a> Sym8Sym16Variant<'a> {
    /// Accepts only [`QuantParams::Symmetric16`] with shifts in `[-31, 7]`.
    pub fn from_quant(quant: &QuantParams<'a>) -> Result<Self> {
        let p = Precision::Sym8Sym16;
        match *quant {
            QuantParams::Symmetric16 {
                multipliers,
                shifts,
            } => {
                check_per_channel(p, multipliers, shifts, -31, 7)?;
                Ok(Self {
                    multipliers,
                    shifts,
                })
            }
            ref other => Err(mismatch(p, other)),
        }
    }
}

impl DepthwiseVariant for Sym8Sym16Variant<'_> {
    const PRECISION: Precision = Precision::Sym8Sym16;
    type Input = i16;
    type Kernel = i8;
    type Bias = i64;
    type Output = i16;
    type Acc = i64;

    #[inline]
    fn input_pad(&self) -> i16 {
        0
    }

    #[inline]
    fn kernel_pad(&self) -> i8 {
        0
    }

    #[inline(always)]
    fn mac(&self, acc: i64, x: i16, k: i8) -> i64 {
        acc + x as i64 * k as i64
    }

    #[inline]
    fn finish(&self, acc: i64, bias: Option<i64>, channel: usize) -> i16 {
        let acc = acc.saturating_add(bias.unwrap_or(0));
        let scaled = multiply_by_quantized_multiplier_reduced(
            acc,
            self.multipliers[channel],
            self.shifts[channel],
        );
        i16::saturate_from(scaled)
    }

    fn check_channels(&self, out_channels: usize) -> Result<()> {
        check_channel_count(Self::PRECISION, self.multipliers.len(), out_channels)
    }
}
