//! Dilated-stride decomposition of one convolution axis.
//!
//! A dilated, strided 1-D convolution with dilation `d` and stride `s`
//! splits into `count = d / gcd(d, s)` interleaved sub-convolutions. Output
//! `o = r + q * count` of residue class `r` reads input samples
//!
//! ```text
//! origin_r + (q * s' + k) * d,   origin_r = r * s - pad,   s' = s / gcd(d, s)
//! ```
//!
//! so in the subsampled sequence `u[j] = input[origin_r + j * d]` it is an
//! ordinary undilated convolution with stride `s'`. The streaming window
//! over `u` never exceeds `kernel + (tile - 1) * s'` entries, however large
//! the dilation.

use smallvec::SmallVec;

/// Greatest common divisor.
pub fn gcd(a: usize, b: usize) -> usize {
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// One residue class of a decomposed axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubAxis {
    /// First output index of this class.
    pub residue: usize,
    /// Spacing between consecutive outputs of this class.
    pub out_step: usize,
    /// Outputs in this class.
    pub outputs: usize,
    /// Reduced stride in subsampled coordinates.
    pub stride: usize,
    /// Input coordinate of `u[0]`; negative inside the leading padding.
    pub origin: isize,
    /// Input distance between consecutive subsampled entries (the dilation).
    pub in_step: usize,
    /// Input extent.
    pub input_len: usize,
    /// Subsampled entries before the first real sample.
    pub pad_before: usize,
    /// Subsampled index one past the last real sample.
    pub real_end: usize,
}

impl SubAxis {
    fn new(
        residue: usize,
        out_step: usize,
        outputs: usize,
        stride: usize,
        origin: isize,
        in_step: usize,
        input_len: usize,
    ) -> Self {
        let step = in_step as isize;
        let pad_before = if origin < 0 {
            ((-origin + step - 1) / step) as usize
        } else {
            0
        };
        let remaining = input_len as isize - origin;
        let real_end = if remaining > 0 {
            ((remaining + step - 1) / step) as usize
        } else {
            0
        };
        Self {
            residue,
            out_step,
            outputs,
            stride,
            origin,
            in_step,
            input_len,
            pad_before,
            real_end,
        }
    }

    /// Input coordinate of subsampled entry `j`, or `None` inside padding.
    #[inline]
    pub fn sample(&self, j: usize) -> Option<usize> {
        if j >= self.pad_before && j < self.real_end {
            Some((self.origin + (j * self.in_step) as isize) as usize)
        } else {
            None
        }
    }

    /// Split `start..start + len` into `(leading pad, real, trailing pad)`
    /// counts.
    pub fn split(&self, start: usize, len: usize) -> (usize, usize, usize) {
        let end = start + len;
        let real_lo = self.pad_before.clamp(start, end);
        let real_hi = self.real_end.clamp(real_lo, end);
        (real_lo - start, real_hi - real_lo, end - real_hi)
    }

    /// Full-axis output index of sub-output `q`.
    #[inline]
    pub fn output_index(&self, q: usize) -> usize {
        self.residue + q * self.out_step
    }

    /// Subsampled entries read by the whole class with a `kernel`-tap filter.
    #[inline]
    pub fn span(&self, kernel: usize) -> usize {
        if self.outputs == 0 {
            0
        } else {
            (self.outputs - 1) * self.stride + kernel
        }
    }
}

/// Decompose one axis into its residue classes, skipping empty ones.
///
/// `pad_before` is the resolved padding ahead of the first input sample.
/// With `dilation == 1` the result is a single class equal to the plain
/// strided convolution.
pub fn decompose_axis(
    input_len: usize,
    output_len: usize,
    stride: usize,
    dilation: usize,
    pad_before: usize,
) -> SmallVec<[SubAxis; 4]> {
    let g = gcd(dilation, stride);
    let count = dilation / g;
    let reduced_stride = stride / g;
    (0..count.min(output_len))
        .map(|r| {
            let outputs = (output_len - r).div_ceil(count);
            let origin = (r * stride) as isize - pad_before as isize;
            SubAxis::new(r, count, outputs, reduced_stride, origin, dilation, input_len)
        })
        .filter(|sub| sub.outputs > 0)
        .collect()
}

/// Largest output count over the classes.
pub fn max_outputs(subs: &[SubAxis]) -> usize {
    subs.iter().map(|s| s.outputs).max().unwrap_or(0)
}
