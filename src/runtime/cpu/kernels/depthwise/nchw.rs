//! Channel-first driver: streams padded input rows.
//!
//! Rows are decomposed by the dilated-stride decomposer; columns are
//! covered by spacing the staged taps `dilation_x` apart. For each input
//! channel the `M` filters are staged once and every residue class of rows
//! is streamed through the circular buffer, `tile` output rows per feed.

use super::row::{RowKernel, TapSpan};
use crate::algorithm::decompose_axis;
use crate::error::Result;
use crate::ops::{Accumulator, DepthwiseVariant, KernelPath};
use crate::runtime::cpu::circ_buf::{CircularBuffer, FeedStats};
use crate::runtime::cpu::kernels::stager;
use crate::runtime::cpu::scratch::{ConvPlan, ScratchParts};
use crate::tensor::{TensorView, TensorViewMut};

/// Copy one input row into a ring slot, `pad_left` pad values ahead of it.
#[inline]
fn load_row<T: Copy>(slot: &mut [T], src: &[T], pad_left: usize, pad: T) {
    slot.fill(pad);
    let start = pad_left.min(slot.len());
    let n = src.len().min(slot.len() - start);
    slot[start..start + n].copy_from_slice(&src[..n]);
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn run<V: DepthwiseVariant>(
    variant: &V,
    plan: &ConvPlan,
    input: &TensorView<'_, V::Input>,
    kernel: &[V::Kernel],
    bias: Option<&[V::Bias]>,
    output: &mut TensorViewMut<'_, V::Output>,
    parts: ScratchParts<'_, V::Input, V::Kernel, V::Acc>,
    path: KernelPath,
) -> Result<()> {
    let g = &plan.geometry;
    let ScratchParts {
        state,
        ring,
        kernel: staging,
        acc,
    } = parts;

    let pad = variant.input_pad();
    let mut ring = CircularBuffer::new(state, ring);
    ring.init(plan.ring_capacity, plan.ring_stride, pad)?;
    stager::prepare(staging, variant.kernel_pad());

    let row_kernel = RowKernel::select(plan.kernel_row, path);
    let subs = decompose_axis(
        g.input.height,
        g.output.height,
        g.stride_y,
        g.dilation_y,
        g.pad_top,
    );
    log::debug!(
        "depthwise nchw: {} row loop, {} row classes, tile {}, ring {}x{}",
        row_kernel.name(),
        subs.len(),
        plan.tile,
        plan.ring_capacity,
        plan.ring_stride
    );

    let kh = g.kernel.height;
    let kw_pad = plan.kernel_row;
    let filter_len = kh * kw_pad;
    let span = TapSpan::new(g.kernel.width, g.dilation_x);
    let (in_h, in_w) = (g.input.height, g.input.width);
    let plane_len = in_h * in_w;
    let acc = &mut acc[..g.output.width];
    let data = input.data();
    let mut fed = FeedStats::default();

    for c in 0..g.input.channels {
        stager::stage_channel_first(
            staging,
            kernel,
            c,
            g.multiplier,
            kh,
            g.kernel.width,
            g.dilation_x,
            kw_pad,
        )?;
        let plane = &data[c * plane_len..(c + 1) * plane_len];

        for sub in &subs {
            if c == 0 {
                log::trace!(
                    "row class {}: {} outputs, stride {}, origin {}",
                    sub.residue,
                    sub.outputs,
                    sub.stride,
                    sub.origin
                );
            }
            ring.restart()?;
            let mut q = 0;
            while q < sub.outputs {
                let n = plan.tile.min(sub.outputs - q);
                let start = q * sub.stride;
                let len = (n - 1) * sub.stride + kh;
                fed += ring.feed(sub, start, len, |iy, slot| {
                    load_row(slot, &plane[iy * in_w..(iy + 1) * in_w], g.pad_left, pad)
                })?;
                let window = ring.window(start, len)?;
                let flat = window.contiguous();
                let stride = window.stride();
                let row_at = |i: usize| match flat {
                    Some(rows) => &rows[i * stride..(i + 1) * stride],
                    None => window.row(i),
                };

                for m in 0..g.multiplier {
                    let oc = c * g.multiplier + m;
                    let filter = &staging[m * filter_len..(m + 1) * filter_len];
                    let b = bias.map(|b| b[oc]);
                    for t in 0..n {
                        acc.fill(V::Acc::zero());
                        for ky in 0..kh {
                            row_kernel.accumulate(
                                variant,
                                acc,
                                row_at(t * sub.stride + ky),
                                &filter[ky * kw_pad..(ky + 1) * kw_pad],
                                span,
                                g.stride_x,
                            );
                        }
                        let oy = sub.output_index(q + t);
                        for (ox, &a) in acc.iter().enumerate() {
                            output.set(oy, ox, oc, variant.finish(a, b, oc));
                        }
                    }
                }
                q += n;
            }
        }
    }
    log::debug!(
        "depthwise nchw: fed {} rows ({} real, {} pad), skipped {}",
        fed.added,
        fed.real,
        fed.pad_lead + fed.pad_trail,
        fed.skipped
    );
    Ok(())
}
