//! Convolution hyperparameters.
//!
//! This module defines [`PaddingMode`] and [`ConvParams`], the caller-facing
//! description of one depthwise convolution.

use crate::tensor::KernelShape;

/// Padding mode for convolution operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingMode {
    /// No padding - output is smaller than input.
    #[default]
    Valid,
    /// Padding to make output same size as input (when stride=1).
    Same,
    /// Custom padding specified as explicit values: (top, bottom, left, right).
    Custom(usize, usize, usize, usize),
}

impl PaddingMode {
    /// Creates padding for a specific amount on all sides.
    pub fn uniform(padding: usize) -> Self {
        PaddingMode::Custom(padding, padding, padding, padding)
    }

    /// Creates padding of `pad_x` on the left and right and `pad_y` on the
    /// top and bottom.
    pub fn symmetric(pad_x: usize, pad_y: usize) -> Self {
        PaddingMode::Custom(pad_y, pad_y, pad_x, pad_x)
    }

    /// Creates fully explicit asymmetric padding.
    pub fn explicit(top: usize, bottom: usize, left: usize, right: usize) -> Self {
        PaddingMode::Custom(top, bottom, left, right)
    }

    /// Returns the name of the padding mode for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            PaddingMode::Valid => "valid",
            PaddingMode::Same => "same",
            PaddingMode::Custom(..) => "custom",
        }
    }
}

/// Hyperparameters of one depthwise convolution.
///
/// Every size must be positive. Validation happens once, at the public
/// entry point; kernels never re-check these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvParams {
    /// Filter rows.
    pub kernel_height: usize,
    /// Filter columns.
    pub kernel_width: usize,
    /// Output channels produced per input channel.
    pub channel_multiplier: usize,
    /// Horizontal stride.
    pub stride_x: usize,
    /// Vertical stride.
    pub stride_y: usize,
    /// Horizontal spacing between filter taps.
    pub dilation_x: usize,
    /// Vertical spacing between filter taps.
    pub dilation_y: usize,
    /// Padding policy.
    pub padding: PaddingMode,
}

impl ConvParams {
    /// Unit stride, no dilation, valid padding.
    pub fn new(kernel: KernelShape, channel_multiplier: usize) -> Self {
        Self {
            kernel_height: kernel.height,
            kernel_width: kernel.width,
            channel_multiplier,
            stride_x: 1,
            stride_y: 1,
            dilation_x: 1,
            dilation_y: 1,
            padding: PaddingMode::Valid,
        }
    }

    /// Set `(stride_x, stride_y)`.
    pub fn with_stride(mut self, stride_x: usize, stride_y: usize) -> Self {
        self.stride_x = stride_x;
        self.stride_y = stride_y;
        self
    }

    /// Set `(dilation_x, dilation_y)`.
    pub fn with_dilation(mut self, dilation_x: usize, dilation_y: usize) -> Self {
        self.dilation_x = dilation_x;
        self.dilation_y = dilation_y;
        self
    }

    /// Set the padding policy.
    pub fn with_padding(mut self, padding: PaddingMode) -> Self {
        self.padding = padding;
        self
    }

    /// Filter extent.
    #[inline]
    pub fn kernel_shape(&self) -> KernelShape {
        KernelShape::new(self.kernel_height, self.kernel_width)
    }
}
