//! Shared validation and geometry for depthwise convolution.
//!
//! Both the scratch planner and the compute entry points go through
//! [`validate_depthwise`], so the output extent and the resolved paddings
//! are computed by exactly one formula.

use crate::error::{Error, Result};
use crate::ops::{ConvParams, PaddingMode};
use crate::tensor::{KernelShape, TensorShape};

const OP: &str = "depthwise_conv2d";

/// Validates that a size parameter is non-zero.
#[inline]
pub fn validate_positive(value: usize, name: &'static str) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidArgument {
            arg: name,
            reason: format!("{} requires {} > 0, got 0", OP, name),
        });
    }
    Ok(())
}

/// Validates that a computed count fits a signed 32-bit integer.
#[inline]
pub fn validate_i32_range(value: usize, what: &'static str) -> Result<()> {
    if value > i32::MAX as usize {
        return Err(Error::CapacityOverflow { what });
    }
    Ok(())
}

/// Validates that bias has the correct length.
#[inline]
pub fn validate_bias_length(bias_len: usize, c_out: usize) -> Result<()> {
    if bias_len != c_out {
        return Err(Error::InvalidArgument {
            arg: "bias",
            reason: format!(
                "{} bias should have length C*M = {}, got {}",
                OP, c_out, bias_len
            ),
        });
    }
    Ok(())
}

/// Extent covered by `kernel_size` taps spaced `dilation` apart.
#[inline]
pub fn dilated_extent(kernel_size: usize, dilation: usize) -> usize {
    dilation * (kernel_size - 1) + 1
}

/// Computes output size for a single dimension in convolution.
///
/// output_size = floor((input_size + pad_before + pad_after - dilation * (kernel_size - 1) - 1) / stride + 1)
#[inline]
pub fn compute_output_size(
    input_size: usize,
    kernel_size: usize,
    stride: usize,
    dilation: usize,
    pad_before: usize,
    pad_after: usize,
) -> usize {
    let effective_kernel = dilated_extent(kernel_size, dilation);
    let padded_size = input_size + pad_before + pad_after;
    if padded_size < effective_kernel {
        0
    } else {
        (padded_size - effective_kernel) / stride + 1
    }
}

/// Computes padding values for "same" padding mode.
///
/// Same padding ensures output_size == input_size when stride == 1.
/// When stride > 1, output_size = ceil(input_size / stride).
#[inline]
pub fn compute_same_padding(
    input_size: usize,
    kernel_size: usize,
    stride: usize,
    dilation: usize,
) -> (usize, usize) {
    let effective_kernel = dilated_extent(kernel_size, dilation);
    let output_size = input_size.div_ceil(stride);
    let total_pad = if output_size > 0 {
        let needed = (output_size - 1) * stride + effective_kernel;
        needed.saturating_sub(input_size)
    } else {
        0
    };
    let pad_before = total_pad / 2;
    let pad_after = total_pad - pad_before;
    (pad_before, pad_after)
}

/// Resolves padding mode to explicit `(top, bottom, left, right)` values.
#[inline]
pub fn resolve_padding_2d(
    padding: PaddingMode,
    input_h: usize,
    input_w: usize,
    kernel: KernelShape,
    stride: (usize, usize),
    dilation: (usize, usize),
) -> (usize, usize, usize, usize) {
    match padding {
        PaddingMode::Valid => (0, 0, 0, 0),
        PaddingMode::Same => {
            let (pad_top, pad_bottom) =
                compute_same_padding(input_h, kernel.height, stride.0, dilation.0);
            let (pad_left, pad_right) =
                compute_same_padding(input_w, kernel.width, stride.1, dilation.1);
            (pad_top, pad_bottom, pad_left, pad_right)
        }
        PaddingMode::Custom(top, bottom, left, right) => (top, bottom, left, right),
    }
}

/// Parameters for a depthwise convolution after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthwiseGeometry {
    /// Input extent.
    pub input: TensorShape,
    /// Output extent; `channels == input.channels * multiplier`.
    pub output: TensorShape,
    /// Filter extent (undilated).
    pub kernel: KernelShape,
    /// Channel multiplier.
    pub multiplier: usize,
    /// Horizontal stride.
    pub stride_x: usize,
    /// Vertical stride.
    pub stride_y: usize,
    /// Horizontal dilation.
    pub dilation_x: usize,
    /// Vertical dilation.
    pub dilation_y: usize,
    /// Rows of padding above the input.
    pub pad_top: usize,
    /// Rows of padding below the input.
    pub pad_bottom: usize,
    /// Columns of padding left of the input.
    pub pad_left: usize,
    /// Columns of padding right of the input.
    pub pad_right: usize,
}

impl DepthwiseGeometry {
    /// Number of output channels, `C * M`.
    #[inline]
    pub fn out_channels(&self) -> usize {
        self.output.channels
    }

    /// Number of taps in the kernel tensor, `kh * kw * C * M`.
    #[inline]
    pub fn kernel_len(&self) -> usize {
        self.kernel.taps() * self.out_channels()
    }

    /// Rows covered by one dilated filter.
    #[inline]
    pub fn dilated_kernel_height(&self) -> usize {
        dilated_extent(self.kernel.height, self.dilation_y)
    }

    /// Columns covered by one dilated filter.
    #[inline]
    pub fn dilated_kernel_width(&self) -> usize {
        dilated_extent(self.kernel.width, self.dilation_x)
    }
}

/// Validates a depthwise convolution and resolves its geometry.
///
/// Every size must be positive, the padded input must hold at least one
/// dilated filter, and every count the engine derives must fit a signed
/// 32-bit integer.
pub fn validate_depthwise(input: TensorShape, params: &ConvParams) -> Result<DepthwiseGeometry> {
    validate_positive(input.height, "input_height")?;
    validate_positive(input.width, "input_width")?;
    validate_positive(input.channels, "input_channels")?;
    validate_positive(params.kernel_height, "kernel_height")?;
    validate_positive(params.kernel_width, "kernel_width")?;
    validate_positive(params.channel_multiplier, "channel_multiplier")?;
    validate_positive(params.stride_x, "stride_x")?;
    validate_positive(params.stride_y, "stride_y")?;
    validate_positive(params.dilation_x, "dilation_x")?;
    validate_positive(params.dilation_y, "dilation_y")?;

    for (value, what) in [
        (input.height, "input height"),
        (input.width, "input width"),
        (input.channels, "input channels"),
        (params.kernel_height, "kernel height"),
        (params.kernel_width, "kernel width"),
        (params.channel_multiplier, "channel multiplier"),
        (params.stride_x, "stride"),
        (params.stride_y, "stride"),
        (params.dilation_x, "dilation"),
        (params.dilation_y, "dilation"),
    ] {
        validate_i32_range(value, what)?;
    }
    let in_numel = input.checked_numel().ok_or(Error::CapacityOverflow {
        what: "input size",
    })?;
    validate_i32_range(in_numel, "input size")?;

    if let PaddingMode::Custom(top, bottom, left, right) = params.padding {
        for pad in [top, bottom, left, right] {
            validate_i32_range(pad, "padding")?;
        }
    }

    let kernel = params.kernel_shape();
    // Dilated extents are bounded by i32::MAX^2, which fits usize on 64-bit
    // targets; go through checked arithmetic anyway.
    let kh_dil = (params.kernel_height - 1)
        .checked_mul(params.dilation_y)
        .and_then(|v| v.checked_add(1))
        .ok_or(Error::CapacityOverflow {
            what: "dilated kernel height",
        })?;
    let kw_dil = (params.kernel_width - 1)
        .checked_mul(params.dilation_x)
        .and_then(|v| v.checked_add(1))
        .ok_or(Error::CapacityOverflow {
            what: "dilated kernel width",
        })?;
    validate_i32_range(kh_dil, "dilated kernel height")?;
    validate_i32_range(kw_dil, "dilated kernel width")?;

    let (pad_top, pad_bottom, pad_left, pad_right) = resolve_padding_2d(
        params.padding,
        input.height,
        input.width,
        kernel,
        (params.stride_y, params.stride_x),
        (params.dilation_y, params.dilation_x),
    );

    let out_h = compute_output_size(
        input.height,
        params.kernel_height,
        params.stride_y,
        params.dilation_y,
        pad_top,
        pad_bottom,
    );
    let out_w = compute_output_size(
        input.width,
        params.kernel_width,
        params.stride_x,
        params.dilation_x,
        pad_left,
        pad_right,
    );
    if out_h == 0 || out_w == 0 {
        return Err(Error::InvalidArgument {
            arg: "padding",
            reason: format!(
                "{} output would be empty: input {:?}, dilated kernel {}x{}, padding {} ({}, {}, {}, {})",
                OP,
                input,
                kh_dil,
                kw_dil,
                params.padding.name(),
                pad_top,
                pad_bottom,
                pad_left,
                pad_right
            ),
        });
    }

    let out_channels = input
        .channels
        .checked_mul(params.channel_multiplier)
        .ok_or(Error::CapacityOverflow {
            what: "output channels",
        })?;
    validate_i32_range(out_channels, "output channels")?;

    let output = TensorShape::new(out_h, out_w, out_channels);
    let out_numel = output.checked_numel().ok_or(Error::CapacityOverflow {
        what: "output size",
    })?;
    validate_i32_range(out_numel, "output size")?;

    let kernel_len = kernel
        .taps()
        .checked_mul(out_channels)
        .ok_or(Error::CapacityOverflow {
            what: "kernel size",
        })?;
    validate_i32_range(kernel_len, "kernel size")?;

    Ok(DepthwiseGeometry {
        input,
        output,
        kernel,
        multiplier: params.channel_multiplier,
        stride_x: params.stride_x,
        stride_y: params.stride_y,
        dilation_x: params.dilation_x,
        dilation_y: params.dilation_y,
        pad_top,
        pad_bottom,
        pad_left,
        pad_right,
    })
}
