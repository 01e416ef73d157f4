//! Depthwise convolution operations
//!
//! This module defines the parameter types, the per-precision arithmetic
//! and the public entry points.
//!
//! # Design
//!
//! Every call follows the same two-phase contract:
//!
//! ```text
//! scratch_size(input, layout, params, precision)   -> bytes (pure)
//!   caller allocates scratch (e.g. ScratchBuffer)
//! depthwise_conv2d(variant, output, input, kernel, bias, params, scratch)
//!   ├── validate_depthwise       (geometry, once)
//!   ├── plan + bind              (typed scratch regions)
//!   └── kernels::depthwise::run  (circular buffer -> stager -> MAC -> requant)
//! ```
//!
//! The arithmetic is supplied by a [`DepthwiseVariant`]; the precision
//! wrappers ([`depthwise_conv2d_f32`], [`depthwise_conv2d_asym8`], ...)
//! build the right variant from a [`QuantParams`].

pub mod conv_common;
mod depthwise;
mod options;
pub mod quant;
pub mod traits;
pub mod variants;

pub use conv_common::{validate_depthwise, DepthwiseGeometry};
pub use depthwise::{
    depthwise_conv2d, depthwise_conv2d_16x16, depthwise_conv2d_8x8, depthwise_conv2d_asym8,
    depthwise_conv2d_batch, depthwise_conv2d_f32, depthwise_conv2d_per_chan_sym8,
    depthwise_conv2d_sym8x16, depthwise_conv2d_with, output_shape, scratch_size,
    scratch_size_status,
};
pub use options::{ComputeOptions, KernelPath};
pub use quant::{quantize_multiplier, QuantParams};
pub use traits::{Accumulator, ConvParams, DepthwiseVariant, PaddingMode};
pub use variants::{
    Asym8Variant, F32Variant, Fixed16Variant, Fixed8Variant, FixedPoint, PerChannelSym8Variant,
    Sym8Sym16Variant,
};
