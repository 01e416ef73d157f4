//! Operation traits and parameter types.
//!
//! Implementations of [`DepthwiseVariant`] live in `ops::variants`; the
//! generic kernels that consume them live in `runtime::cpu::kernels`.

mod conv;
mod variant;

pub use conv::{ConvParams, PaddingMode};
pub use variant::{Accumulator, DepthwiseVariant};
