//! Channel-last driver: streams padded input columns.
//!
//! Columns are decomposed by the dilated-stride decomposer; rows are
//! covered by staging the kernel with filter rows `dilation_y` apart and
//! visiting only those staged rows, never the gap rows between them. A
//! column holds every padded input row, each row widened to all `C*M`
//! output channels so the inner loop runs straight across channels.

use crate::algorithm::decompose_axis;
use crate::error::Result;
use crate::ops::{Accumulator, DepthwiseVariant};
use crate::runtime::cpu::circ_buf::{CircularBuffer, FeedStats};
use crate::runtime::cpu::kernels::stager;
use crate::runtime::cpu::scratch::{ConvPlan, ScratchParts};
use crate::tensor::{TensorView, TensorViewMut};

/// Fill a ring slot with input column `x`.
///
/// Row `y` lands at slot row `y + pad_top`; channel `c` is repeated for
/// each of its `multiplier` output channels.
#[allow(clippy::too_many_arguments)]
fn load_column<T: Copy>(
    slot: &mut [T],
    src: &[T],
    column: usize,
    width: usize,
    channels: usize,
    multiplier: usize,
    pad_top: usize,
    row_len: usize,
    pad: T,
) {
    slot.fill(pad);
    let col_height = slot.len() / row_len;
    let height = src.len() / (width * channels);
    for y in 0..height {
        let r = y + pad_top;
        if r >= col_height {
            break;
        }
        let pixel = &src[(y * width + column) * channels..][..channels];
        let dst = &mut slot[r * row_len..][..channels * multiplier];
        for (group, &v) in dst.chunks_exact_mut(multiplier).zip(pixel) {
            group.fill(v);
        }
    }
}

/// `acc[ch] += col[ch] * taps[ch]` for every channel, four at a time.
#[inline]
fn accumulate_channels<V: DepthwiseVariant>(
    variant: &V,
    acc: &mut [V::Acc],
    col: &[V::Input],
    taps: &[V::Kernel],
) {
    for ((a, x), k) in acc
        .chunks_exact_mut(4)
        .zip(col.chunks_exact(4))
        .zip(taps.chunks_exact(4))
    {
        a[0] = variant.mac(a[0], x[0], k[0]);
        a[1] = variant.mac(a[1], x[1], k[1]);
        a[2] = variant.mac(a[2], x[2], k[2]);
        a[3] = variant.mac(a[3], x[3], k[3]);
    }
}

pub(crate) fn run<V: DepthwiseVariant>(
    variant: &V,
    plan: &ConvPlan,
    input: &TensorView<'_, V::Input>,
    kernel: &[V::Kernel],
    bias: Option<&[V::Bias]>,
    output: &mut TensorViewMut<'_, V::Output>,
    parts: ScratchParts<'_, V::Input, V::Kernel, V::Acc>,
) -> Result<()> {
    let g = &plan.geometry;
    let ScratchParts {
        state,
        ring,
        kernel: staging,
        acc,
    } = parts;

    let cm = g.out_channels();
    let cm_pad = plan.kernel_row;
    let kw = g.kernel.width;
    let kh = g.kernel.height;

    let pad = variant.input_pad();
    let mut ring = CircularBuffer::new(state, ring);
    ring.init(plan.ring_capacity, plan.ring_stride, pad)?;
    stager::prepare(staging, variant.kernel_pad());
    stager::stage_channel_last(
        staging,
        kernel,
        cm,
        kh,
        kw,
        g.dilation_y,
        cm_pad,
    )?;
    let staging = &*staging;

    let subs = decompose_axis(
        g.input.width,
        g.output.width,
        g.stride_x,
        g.dilation_x,
        g.pad_left,
    );
    log::debug!(
        "depthwise nhwc: {} column classes, tile {}, ring {}x{}",
        subs.len(),
        plan.tile,
        plan.ring_capacity,
        plan.ring_stride
    );

    let acc = &mut acc[..cm_pad];
    let data = input.data();
    let (in_w, channels) = (g.input.width, g.input.channels);
    let mut fed = FeedStats::default();

    for sub in &subs {
        log::trace!(
            "column class {}: {} outputs, stride {}, origin {}",
            sub.residue,
            sub.outputs,
            sub.stride,
            sub.origin
        );
        ring.restart()?;
        let mut q = 0;
        while q < sub.outputs {
            let n = plan.tile.min(sub.outputs - q);
            let start = q * sub.stride;
            let len = (n - 1) * sub.stride + kw;
            fed += ring.feed(sub, start, len, |ix, slot| {
                load_column(
                    slot,
                    data,
                    ix,
                    in_w,
                    channels,
                    g.multiplier,
                    g.pad_top,
                    cm_pad,
                    pad,
                )
            })?;
            let window = ring.window(start, len)?;
            let flat = window.contiguous();
            let stride = window.stride();
            let column_at = |i: usize| match flat {
                Some(cols) => &cols[i * stride..(i + 1) * stride],
                None => window.row(i),
            };

            for t in 0..n {
                let ox = sub.output_index(q + t);
                for oy in 0..g.output.height {
                    acc.fill(V::Acc::zero());
                    for ky in 0..kh {
                        let dy = ky * g.dilation_y;
                        let base = (oy * g.stride_y + dy) * cm_pad;
                        for kx in 0..kw {
                            let col = &column_at(t * sub.stride + kx)[base..base + cm_pad];
                            let taps = &staging[(dy * kw + kx) * cm_pad..][..cm_pad];
                            accumulate_channels(variant, acc, col, taps);
                        }
                    }
                    for (oc, &a) in acc[..cm].iter().enumerate() {
                        output.set(oy, ox, oc, variant.finish(a, bias.map(|b| b[oc]), oc));
                    }
                }
            }
            q += n;
        }
    }
    log::debug!(
        "depthwise nhwc: fed {} columns ({} real, {} pad), skipped {}",
        fed.added,
        fed.real,
        fed.pad_lead + fed.pad_trail,
        fed.skipped
    );
    Ok(())
}
