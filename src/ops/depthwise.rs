//! Public depthwise convolution entry points.

use super::conv_common::{validate_bias_length, validate_depthwise};
use super::variants::{
    Asym8Variant, F32Variant, Fixed16Variant, Fixed8Variant, PerChannelSym8Variant,
    Sym8Sym16Variant,
};
use super::{ComputeOptions, ConvParams, DepthwiseVariant, QuantParams};
use crate::dtype::Precision;
use crate::error::{Error, Result};
use crate::runtime::cpu::kernels::depthwise;
use crate::runtime::cpu::{plan, ScratchBuffer};
use crate::tensor::{DataLayout, TensorShape, TensorView, TensorViewMut};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Output extent of a depthwise convolution.
pub fn output_shape(input: TensorShape, params: &ConvParams) -> Result<TensorShape> {
    Ok(validate_depthwise(input, params)?.output)
}

/// Scratch bytes needed by [`depthwise_conv2d`] for this problem.
///
/// The size depends on the input layout (rows or columns are streamed)
/// and on the precision (element and accumulator widths).
pub fn scratch_size(
    input: TensorShape,
    layout: DataLayout,
    params: &ConvParams,
    precision: Precision,
) -> Result<usize> {
    let geometry = validate_depthwise(input, params)?;
    let plan = plan(&geometry, layout, precision)?;
    log::debug!(
        "depthwise scratch: {} {} input {:?} -> {} bytes",
        precision,
        layout,
        input,
        plan.scratch_bytes()
    );
    Ok(plan.scratch_bytes())
}

/// [`scratch_size`] in sentinel form: the byte count, or a negative status
/// code on invalid input. `layout_tag` is 0 for channel-last, 1 for
/// channel-first.
pub fn scratch_size_status(
    input: TensorShape,
    layout_tag: i32,
    params: &ConvParams,
    precision: Precision,
) -> i64 {
    let result = DataLayout::from_tag(layout_tag)
        .and_then(|layout| scratch_size(input, layout, params, precision));
    match result {
        Ok(bytes) => bytes as i64,
        Err(e) => e.status() as i64,
    }
}

/// Depthwise convolution with default options.
///
/// `kernel` is ordered like the input: `[kh][kw][C*M]` for a channel-last
/// input, `[C*M][kh][kw]` for a channel-first one. Output channel `c*M + m`
/// is input channel `c` convolved with filter `m`. `bias`, if given, has
/// one entry per output channel. `scratch` must be 8-byte aligned and at
/// least [`scratch_size`] bytes.
pub fn depthwise_conv2d<V: DepthwiseVariant>(
    variant: &V,
    output: &mut TensorViewMut<'_, V::Output>,
    input: &TensorView<'_, V::Input>,
    kernel: &[V::Kernel],
    bias: Option<&[V::Bias]>,
    params: &ConvParams,
    scratch: &mut [u8],
) -> Result<()> {
    depthwise_conv2d_with(
        variant,
        output,
        input,
        kernel,
        bias,
        params,
        scratch,
        &ComputeOptions::default(),
    )
}

/// Depthwise convolution with explicit [`ComputeOptions`].
///
/// Every argument is checked before the first output element is written.
#[allow(clippy::too_many_arguments)]
pub fn depthwise_conv2d_with<V: DepthwiseVariant>(
    variant: &V,
    output: &mut TensorViewMut<'_, V::Output>,
    input: &TensorView<'_, V::Input>,
    kernel: &[V::Kernel],
    bias: Option<&[V::Bias]>,
    params: &ConvParams,
    scratch: &mut [u8],
    options: &ComputeOptions,
) -> Result<()> {
    let geometry = validate_depthwise(input.shape(), params)?;
    if output.shape() != geometry.output {
        return Err(Error::InvalidArgument {
            arg: "output",
            reason: format!(
                "expected shape {:?}, got {:?}",
                geometry.output,
                output.shape()
            ),
        });
    }
    if kernel.len() != geometry.kernel_len() {
        return Err(Error::ShapeMismatch {
            arg: "kernel",
            expected: geometry.kernel_len(),
            got: kernel.len(),
        });
    }
    if let Some(b) = bias {
        validate_bias_length(b.len(), geometry.out_channels())?;
    }
    variant.check_channels(geometry.out_channels())?;

    let plan = plan(&geometry, input.layout(), V::PRECISION)?;
    log::debug!(
        "depthwise_conv2d: {} {} -> {}, input {:?}, output {:?}, kernel {}x{} x{}, \
         stride ({}, {}), dilation ({}, {}), scratch {} bytes",
        V::PRECISION,
        input.layout(),
        output.layout(),
        geometry.input,
        geometry.output,
        geometry.kernel.height,
        geometry.kernel.width,
        geometry.multiplier,
        geometry.stride_x,
        geometry.stride_y,
        geometry.dilation_x,
        geometry.dilation_y,
        plan.scratch_bytes()
    );

    depthwise::run(
        variant,
        &plan,
        input,
        kernel,
        bias,
        output,
        scratch,
        options.kernel_path,
    )
}

// ============================================================================
// Per-precision wrappers
// ============================================================================

/// Float depthwise convolution.
pub fn depthwise_conv2d_f32(
    output: &mut TensorViewMut<'_, f32>,
    input: &TensorView<'_, f32>,
    kernel: &[f32],
    bias: Option<&[f32]>,
    params: &ConvParams,
    scratch: &mut [u8],
) -> Result<()> {
    depthwise_conv2d(&F32Variant, output, input, kernel, bias, params, scratch)
}

/// 8-bit fixed-point depthwise convolution; `quant` must be
/// [`QuantParams::Fixed`].
pub fn depthwise_conv2d_8x8(
    output: &mut TensorViewMut<'_, i8>,
    input: &TensorView<'_, i8>,
    kernel: &[i8],
    bias: Option<&[i8]>,
    params: &ConvParams,
    quant: &QuantParams<'_>,
    scratch: &mut [u8],
) -> Result<()> {
    let variant = Fixed8Variant::from_quant(quant)?;
    depthwise_conv2d(&variant, output, input, kernel, bias, params, scratch)
}

/// 16-bit fixed-point depthwise convolution; `quant` must be
/// [`QuantParams::Fixed`].
pub fn depthwise_conv2d_16x16(
    output: &mut TensorViewMut<'_, i16>,
    input: &TensorView<'_, i16>,
    kernel: &[i16],
    bias: Option<&[i16]>,
    params: &ConvParams,
    quant: &QuantParams<'_>,
    scratch: &mut [u8],
) -> Result<()> {
    let variant = Fixed16Variant::from_quant(quant)?;
    depthwise_conv2d(&variant, output, input, kernel, bias, params, scratch)
}

/// Asymmetric 8-bit depthwise convolution; `quant` must be
/// [`QuantParams::Asymmetric`].
pub fn depthwise_conv2d_asym8(
    output: &mut TensorViewMut<'_, i8>,
    input: &TensorView<'_, i8>,
    kernel: &[i8],
    bias: Option<&[i32]>,
    params: &ConvParams,
    quant: &QuantParams<'_>,
    scratch: &mut [u8],
) -> Result<()> {
    let variant = Asym8Variant::from_quant(quant)?;
    depthwise_conv2d(&variant, output, input, kernel, bias, params, scratch)
}

/// Per-channel symmetric 8-bit kernel depthwise convolution; `quant` must be
/// [`QuantParams::PerChannel`].
pub fn depthwise_conv2d_per_chan_sym8(
    output: &mut TensorViewMut<'_, i8>,
    input: &TensorView<'_, i8>,
    kernel: &[i8],
    bias: Option<&[i32]>,
    params: &ConvParams,
    quant: &QuantParams<'_>,
    scratch: &mut [u8],
) -> Result<()> {
    let variant = PerChannelSym8Variant::from_quant(quant)?;
    depthwise_conv2d(&variant, output, input, kernel, bias, params, scratch)
}

/// Symmetric 8-bit kernel x symmetric 16-bit activation depthwise
/// convolution; `quant` must be [`QuantParams::Symmetric16`].
pub fn depthwise_conv2d_sym8x16(
    output: &mut TensorViewMut<'_, i16>,
    input: &TensorView<'_, i16>,
    kernel: &[i8],
    bias: Option<&[i64]>,
    params: &ConvParams,
    quant: &QuantParams<'_>,
    scratch: &mut [u8],
) -> Result<()> {
    let variant = Sym8Sym16Variant::from_quant(quant)?;
    depthwise_conv2d(&variant, output, input, kernel, bias, params, scratch)
}

// ============================================================================
// Batches
// ============================================================================

/// Run the same convolution over a batch of inputs stored back to back.
///
/// `inputs` holds `N` tensors of `input_shape`; `outputs` receives `N`
/// tensors of the output shape. Every item gets its own scratch buffer;
/// with the `rayon` feature the items run in parallel.
#[allow(clippy::too_many_arguments)]
pub fn depthwise_conv2d_batch<V: DepthwiseVariant>(
    variant: &V,
    outputs: &mut [V::Output],
    output_layout: DataLayout,
    inputs: &[V::Input],
    input_shape: TensorShape,
    input_layout: DataLayout,
    kernel: &[V::Kernel],
    bias: Option<&[V::Bias]>,
    params: &ConvParams,
) -> Result<()> {
    let geometry = validate_depthwise(input_shape, params)?;
    let item_in = geometry.input.numel();
    let item_out = geometry.output.numel();
    if inputs.len() % item_in != 0 {
        return Err(Error::invalid(
            "inputs",
            format!(
                "length {} is not a multiple of the item size {}",
                inputs.len(),
                item_in
            ),
        ));
    }
    let batch = inputs.len() / item_in;
    let expected = batch
        .checked_mul(item_out)
        .ok_or(Error::CapacityOverflow {
            what: "batch output size",
        })?;
    if outputs.len() != expected {
        return Err(Error::ShapeMismatch {
            arg: "outputs",
            expected,
            got: outputs.len(),
        });
    }
    let bytes = plan(&geometry, input_layout, V::PRECISION)?.scratch_bytes();
    log::debug!(
        "depthwise_conv2d_batch: {} items, {} scratch bytes each",
        batch,
        bytes
    );

    let run_item = |(out_item, in_item): (&mut [V::Output], &[V::Input])| -> Result<()> {
        let input = TensorView::new(in_item, input_shape, input_layout)?;
        let mut output = TensorViewMut::new(out_item, geometry.output, output_layout)?;
        let mut scratch = ScratchBuffer::new(bytes);
        depthwise_conv2d(
            variant,
            &mut output,
            &input,
            kernel,
            bias,
            params,
            scratch.as_bytes_mut(),
        )
    };

    #[cfg(feature = "rayon")]
    {
        outputs
            .par_chunks_mut(item_out)
            .zip(inputs.par_chunks(item_in))
            .try_for_each(run_item)
    }

    #[cfg(not(feature = "rayon"))]
    {
        outputs
            .chunks_mut(item_out)
            .zip(inputs.chunks(item_in))
            .try_for_each(run_item)
    }
}
