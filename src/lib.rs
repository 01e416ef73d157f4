//! # dwconv
//!
//! **Depthwise 2-D convolution for inference, in float and fixed point.**
//!
//! dwconv computes grouped convolutions where every input channel is
//! convolved with its own set of `M` filters (the channel multiplier). It
//! streams the input through a circular buffer held in caller-provided
//! scratch, so a call never allocates.
//!
//! ## Features
//!
//! - **Six precisions**: f32, 8/16-bit fixed point, asymmetric 8-bit,
//!   per-channel symmetric 8-bit and 8-bit kernel x 16-bit activation
//! - **Both layouts**: channel-last (NHWC) and channel-first (NCHW) inputs,
//!   with independent output layout
//! - **Stride and dilation**: dilated strided problems are split into
//!   stride-compatible sub-problems instead of sampling every tap
//! - **Two-phase API**: [`ops::scratch_size`] is pure; the compute call
//!   checks everything before writing output
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dwconv::prelude::*;
//!
//! let shape = TensorShape::new(5, 5, 1);
//! let params = ConvParams::new(KernelShape::new(3, 3), 1).with_padding(PaddingMode::Same);
//! let bytes = scratch_size(shape, DataLayout::ChannelLast, &params, Precision::F32)?;
//! let mut scratch = ScratchBuffer::new(bytes);
//!
//! let input = TensorView::new(&pixels, shape, DataLayout::ChannelLast)?;
//! let mut output = TensorViewMut::new(&mut out, shape, DataLayout::ChannelLast)?;
//! depthwise_conv2d_f32(&mut output, &input, &[1.0; 9], None, &params, scratch.as_bytes_mut())?;
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): parallel batches in [`ops::depthwise_conv2d_batch`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod algorithm;
pub mod dtype;
pub mod error;
pub mod ops;
pub mod runtime;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::Precision;
    pub use crate::error::{Error, Result};
    pub use crate::ops::{
        depthwise_conv2d, depthwise_conv2d_16x16, depthwise_conv2d_8x8, depthwise_conv2d_asym8,
        depthwise_conv2d_batch, depthwise_conv2d_f32, depthwise_conv2d_per_chan_sym8,
        depthwise_conv2d_sym8x16, depthwise_conv2d_with, output_shape, quantize_multiplier,
        scratch_size, scratch_size_status, Asym8Variant, ComputeOptions, ConvParams,
        DepthwiseVariant, F32Variant, Fixed16Variant, Fixed8Variant, KernelPath, PaddingMode,
        PerChannelSym8Variant, QuantParams, Sym8Sym16Variant,
    };
    pub use crate::runtime::cpu::ScratchBuffer;
    pub use crate::tensor::{DataLayout, KernelShape, TensorShape, TensorView, TensorViewMut};
}
