//! Depthwise compute loops.
//!
//! The input layout picks the streaming direction: channel-first inputs
//! stream rows through [`nchw`], channel-last inputs stream columns through
//! [`nhwc`]. Either may write either output layout.

pub(crate) mod nchw;
pub(crate) mod nhwc;
pub mod row;

use crate::dtype::{Element, PadRule};
use crate::error::Result;
use crate::ops::{DepthwiseVariant, KernelPath};
use crate::runtime::cpu::scratch::ConvPlan;
use crate::tensor::{DataLayout, TensorView, TensorViewMut};

pub use row::{RowKernel, TapSpan, FIXED_WIDTHS};

/// Run one planned convolution in `scratch`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run<V: DepthwiseVariant>(
    variant: &V,
    plan: &ConvPlan,
    input: &TensorView<'_, V::Input>,
    kernel: &[V::Kernel],
    bias: Option<&[V::Bias]>,
    output: &mut TensorViewMut<'_, V::Output>,
    scratch: &mut [u8],
    path: KernelPath,
) -> Result<()> {
    debug_assert!(
        V::PRECISION.input_pad() == PadRule::ZeroPoint || variant.input_pad() == V::Input::zero()
    );
    debug_assert!(
        V::PRECISION.kernel_pad() == PadRule::ZeroPoint
            || variant.kernel_pad() == V::Kernel::zero()
    );
    let parts = plan.bind::<V::Input, V::Kernel, V::Acc>(scratch)?;
    match plan.layout {
        DataLayout::ChannelFirst => {
            nchw::run(variant, plan, input, kernel, bias, output, parts, path)
        }
        DataLayout::ChannelLast => nhwc::run(variant, plan, input, kernel, bias, output, parts),
    }
}
