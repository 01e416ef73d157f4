//! The per-precision arithmetic seam.
//!
//! The streaming machinery (circular buffer, kernel stager, compute loops)
//! is written once, generically over [`DepthwiseVariant`]. Each numeric
//! scheme supplies only its storage types, padding values, one
//! multiply-accumulate step and the final requantization.

use crate::dtype::{Element, Precision};
use crate::error::Result;
use bytemuck::Pod;
use std::fmt::Debug;

/// Wide accumulator stored in the accumulator staging region.
pub trait Accumulator: Pod + Copy + Send + Sync + Debug + 'static {
    /// Additive identity.
    fn zero() -> Self;
}

impl Accumulator for f32 {
    #[inline]
    fn zero() -> Self {
        0.0
    }
}

impl Accumulator for i64 {
    #[inline]
    fn zero() -> Self {
        0
    }
}

/// Arithmetic of one numeric scheme.
///
/// Implementations are bound to their quantization parameters, so `mac`
/// and `finish` see zero points, shifts and multipliers without lookups
/// through a tagged union.
pub trait DepthwiseVariant: Sync {
    /// The scheme this implementation computes.
    const PRECISION: Precision;

    /// Input activation storage.
    type Input: Element;
    /// Filter tap storage.
    type Kernel: Element;
    /// Bias storage.
    type Bias: Element;
    /// Output storage.
    type Output: Element;
    /// Accumulator type.
    type Acc: Accumulator;

    /// Stored value that represents a real zero input.
    fn input_pad(&self) -> Self::Input;

    /// Stored value that represents a real zero filter tap.
    fn kernel_pad(&self) -> Self::Kernel;

    /// `acc + (x + input_offset) * (k + kernel_offset)`.
    fn mac(&self, acc: Self::Acc, x: Self::Input, k: Self::Kernel) -> Self::Acc;

    /// Add bias and requantize one accumulator of output channel `channel`.
    fn finish(&self, acc: Self::Acc, bias: Option<Self::Bias>, channel: usize) -> Self::Output;

    /// Check per-channel parameter arrays against the output channel count.
    fn check_channels(&self, _out_channels: usize) -> Result<()> {
        Ok(())
    }
}
