//! Numeric representations supported by the depthwise engine
//!
//! This module provides the [`Precision`] enum, one variant per supported
//! arithmetic scheme, along with the storage-element traits used by the
//! kernels.
//!
//! # Supported schemes
//!
//! | Precision        | Input | Kernel | Bias | Output | Accumulator |
//! |------------------|-------|--------|------|--------|-------------|
//! | `F32`            | f32   | f32    | f32  | f32    | f32         |
//! | `Fixed8`         | i8    | i8     | i8   | i8     | i64         |
//! | `Fixed16`        | i16   | i16    | i16  | i16    | i64         |
//! | `Asym8`          | i8    | i8     | i32  | i8     | i64         |
//! | `PerChannelSym8` | i8    | i8     | i32  | i8     | i64         |
//! | `Sym8Sym16`      | i16   | i8     | i64  | i16    | i64         |

mod element;

pub use element::{Element, Fixed};

use std::fmt;

/// Which value fills padded input samples or padded kernel taps.
///
/// Padding must always contribute a *real* zero to the accumulator. For
/// asymmetric schemes the stored value that represents real zero is the
/// zero point, not `0`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PadRule {
    /// Pad with the literal value zero.
    Zero,
    /// Pad with the operand's zero point.
    ZeroPoint,
}

/// Arithmetic scheme of one depthwise convolution call.
///
/// Each variant fixes the storage types of input, kernel, bias and output,
/// the accumulator width, and the padding rule. Every `match` on this type
/// is exhaustive; adding a variant forces every site to be revisited.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Precision {
    /// 32-bit float throughout.
    F32 = 0,
    /// 8-bit fixed point with global accumulator/bias shifts.
    Fixed8 = 1,
    /// 16-bit fixed point with global accumulator/bias shifts.
    Fixed16 = 2,
    /// Asymmetric signed 8-bit with input, kernel and output zero points and
    /// a single Q31 multiplier/shift pair.
    Asym8 = 3,
    /// Symmetric signed 8-bit kernel, asymmetric signed 8-bit input/output,
    /// one multiplier/shift pair per output channel.
    PerChannelSym8 = 4,
    /// Symmetric signed 8-bit kernel, symmetric 16-bit input/output, 64-bit
    /// bias, one multiplier/shift pair per output channel.
    Sym8Sym16 = 5,
}

impl Precision {
    /// All precisions, in declaration order.
    pub const ALL: [Precision; 6] = [
        Precision::F32,
        Precision::Fixed8,
        Precision::Fixed16,
        Precision::Asym8,
        Precision::PerChannelSym8,
        Precision::Sym8Sym16,
    ];

    /// Size in bytes of one input element.
    #[inline]
    pub const fn input_size(self) -> usize {
        match self {
            Precision::F32 => 4,
            Precision::Fixed8 | Precision::Asym8 | Precision::PerChannelSym8 => 1,
            Precision::Fixed16 | Precision::Sym8Sym16 => 2,
        }
    }

    /// Size in bytes of one kernel tap.
    #[inline]
    pub const fn kernel_size(self) -> usize {
        match self {
            Precision::F32 => 4,
            Precision::Fixed16 => 2,
            Precision::Fixed8
            | Precision::Asym8
            | Precision::PerChannelSym8
            | Precision::Sym8Sym16 => 1,
        }
    }

    /// Size in bytes of one bias entry.
    #[inline]
    pub const fn bias_size(self) -> usize {
        match self {
            Precision::F32 | Precision::Asym8 | Precision::PerChannelSym8 => 4,
            Precision::Fixed8 => 1,
            Precision::Fixed16 => 2,
            Precision::Sym8Sym16 => 8,
        }
    }

    /// Size in bytes of one output element.
    #[inline]
    pub const fn output_size(self) -> usize {
        self.input_size()
    }

    /// Size in bytes of one accumulator.
    ///
    /// Integer schemes accumulate in 64 bits, at least twice the input width.
    #[inline]
    pub const fn accumulator_size(self) -> usize {
        match self {
            Precision::F32 => 4,
            Precision::Fixed8
            | Precision::Fixed16
            | Precision::Asym8
            | Precision::PerChannelSym8
            | Precision::Sym8Sym16 => 8,
        }
    }

    /// Padding rule for input samples outside the tensor.
    #[inline]
    pub const fn input_pad(self) -> PadRule {
        match self {
            Precision::F32 | Precision::Fixed8 | Precision::Fixed16 | Precision::Sym8Sym16 => {
                PadRule::Zero
            }
            Precision::Asym8 | Precision::PerChannelSym8 => PadRule::ZeroPoint,
        }
    }

    /// Padding rule for staged kernel taps beyond the real filter.
    #[inline]
    pub const fn kernel_pad(self) -> PadRule {
        match self {
            Precision::Asym8 => PadRule::ZeroPoint,
            Precision::F32
            | Precision::Fixed8
            | Precision::Fixed16
            | Precision::PerChannelSym8
            | Precision::Sym8Sym16 => PadRule::Zero,
        }
    }

    /// Returns true if output is produced through fixed-point requantization.
    #[inline]
    pub const fn is_quantized(self) -> bool {
        match self {
            Precision::F32 => false,
            Precision::Fixed8
            | Precision::Fixed16
            | Precision::Asym8
            | Precision::PerChannelSym8
            | Precision::Sym8Sym16 => true,
        }
    }

    /// Short name used in logs and error messages.
    pub const fn short_name(self) -> &'static str {
        match self {
            Precision::F32 => "f32",
            Precision::Fixed8 => "8x8",
            Precision::Fixed16 => "16x16",
            Precision::Asym8 => "asym8",
            Precision::PerChannelSym8 => "per_chan_sym8",
            Precision::Sym8Sym16 => "sym8x16",
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
