//! Kernel stager: copies filters into the width-aligned staging region.
//!
//! The whole region is filled with the kernel pad value once per call by
//! [`prepare`]. Staging afterwards only writes real tap positions, so the
//! alignment tail and the gaps between dilated taps keep the pad value
//! across every channel that reuses the region.

use crate::dtype::Element;
use crate::error::{Error, Result};

/// Fill the staging region with `pad`.
pub fn prepare<K: Element>(staging: &mut [K], pad: K) {
    staging.fill(pad);
}

/// Stage the `multiplier` filters of input channel `channel` from a
/// channel-first kernel `[C*M][kh][kw]`.
///
/// Filter `m` lands at `staging[m * kh * row_len..]` as `kh` rows of
/// `row_len` taps, tap `kx` at column `kx * dilation_x`.
#[allow(clippy::too_many_arguments)]
pub fn stage_channel_first<K: Element>(
    staging: &mut [K],
    kernel: &[K],
    channel: usize,
    multiplier: usize,
    kernel_height: usize,
    kernel_width: usize,
    dilation_x: usize,
    row_len: usize,
) -> Result<()> {
    let taps = kernel_height * kernel_width;
    let filter_len = kernel_height * row_len;
    if (kernel_width - 1) * dilation_x >= row_len || staging.len() < multiplier * filter_len {
        return Err(Error::Internal(format!(
            "staging of {} taps cannot hold {} filters of {}x{} (dilation {})",
            staging.len(),
            multiplier,
            kernel_height,
            kernel_width,
            dilation_x
        )));
    }

    for m in 0..multiplier {
        let oc = channel * multiplier + m;
        let src = &kernel[oc * taps..(oc + 1) * taps];
        let dst = &mut staging[m * filter_len..(m + 1) * filter_len];
        for ky in 0..kernel_height {
            let row = &mut dst[ky * row_len..(ky + 1) * row_len];
            for kx in 0..kernel_width {
                row[kx * dilation_x] = src[ky * kernel_width + kx];
            }
        }
    }
    Ok(())
}

/// Stage a channel-last kernel `[kh][kw][C*M]` as `[kh_dil][kw][row_len]`,
/// filter row `ky` landing at dilated row `ky * dilation_y`.
pub fn stage_channel_last<K: Element>(
    staging: &mut [K],
    kernel: &[K],
    out_channels: usize,
    kernel_height: usize,
    kernel_width: usize,
    dilation_y: usize,
    row_len: usize,
) -> Result<()> {
    let kh_dil = (kernel_height - 1) * dilation_y + 1;
    if row_len < out_channels || staging.len() < kh_dil * kernel_width * row_len {
        return Err(Error::Internal(format!(
            "staging of {} taps cannot hold a {}x{}x{} kernel (dilation {})",
            staging.len(),
            kernel_height,
            kernel_width,
            out_channels,
            dilation_y
        )));
    }

    for ky in 0..kernel_height {
        for kx in 0..kernel_width {
            let src = &kernel[(ky * kernel_width + kx) * out_channels..][..out_channels];
            let dst_row = (ky * dilation_y) * kernel_width + kx;
            staging[dst_row * row_len..][..out_channels].copy_from_slice(src);
        }
    }
    Ok(())
}
