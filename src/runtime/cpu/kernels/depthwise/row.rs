//! Row multiply-accumulate loops for the channel-first path.
//!
//! One call accumulates a single staged kernel row into the accumulators of
//! every output column. A staged row is padded to a multiple of four with
//! the real taps `dilation` apart; only the real taps are read, so a pad
//! tap never meets an input sample. The fixed-width loops take the padded
//! row width as a const parameter and work on four output columns at a
//! time; each output still sees its taps in increasing `kx`, so every loop
//! here yields the same bits as [`accumulate_row_generic`].

use crate::ops::{DepthwiseVariant, KernelPath};

/// Padded kernel row widths that have a fixed-width loop.
pub const FIXED_WIDTHS: [usize; 3] = [4, 8, 12];

/// Real taps of one staged row: `count` taps, `dilation` slots apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapSpan {
    /// Number of real taps.
    pub count: usize,
    /// Distance between neighbouring taps.
    pub dilation: usize,
}

impl TapSpan {
    /// `count` taps spaced `dilation` apart.
    pub fn new(count: usize, dilation: usize) -> Self {
        Self { count, dilation }
    }

    /// Every slot of a `width`-wide row.
    pub fn dense(width: usize) -> Self {
        Self::new(width, 1)
    }

    /// Slots from the first tap to the last, inclusive.
    #[inline]
    pub fn extent(self) -> usize {
        match self.count {
            0 => 0,
            n => (n - 1) * self.dilation + 1,
        }
    }
}

/// Inner loop chosen for one convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKernel {
    /// Arbitrary width.
    Generic,
    /// Four taps.
    Fixed4,
    /// Eight taps.
    Fixed8,
    /// Twelve taps.
    Fixed12,
}

impl RowKernel {
    /// Choose the loop for a padded row of `width` taps.
    pub fn select(width: usize, path: KernelPath) -> Self {
        match (path, width) {
            (KernelPath::Generic, _) => RowKernel::Generic,
            (KernelPath::Auto, 4) => RowKernel::Fixed4,
            (KernelPath::Auto, 8) => RowKernel::Fixed8,
            (KernelPath::Auto, 12) => RowKernel::Fixed12,
            (KernelPath::Auto, _) => RowKernel::Generic,
        }
    }

    /// Name for logs.
    pub fn name(self) -> &'static str {
        match self {
            RowKernel::Generic => "generic",
            RowKernel::Fixed4 => "fixed4",
            RowKernel::Fixed8 => "fixed8",
            RowKernel::Fixed12 => "fixed12",
        }
    }

    /// `acc[x] += sum_kx row[x * stride_x + kx * d] * taps[kx * d]` over the
    /// real taps of `span`.
    #[inline]
    pub fn accumulate<V: DepthwiseVariant>(
        self,
        variant: &V,
        acc: &mut [V::Acc],
        row: &[V::Input],
        taps: &[V::Kernel],
        span: TapSpan,
        stride_x: usize,
    ) {
        match self {
            RowKernel::Generic => accumulate_row_generic(variant, acc, row, taps, span, stride_x),
            RowKernel::Fixed4 => {
                accumulate_row_fixed::<V, 4>(variant, acc, row, taps, span, stride_x)
            }
            RowKernel::Fixed8 => {
                accumulate_row_fixed::<V, 8>(variant, acc, row, taps, span, stride_x)
            }
            RowKernel::Fixed12 => {
                accumulate_row_fixed::<V, 12>(variant, acc, row, taps, span, stride_x)
            }
        }
    }
}

/// Arbitrary-width row loop.
pub fn accumulate_row_generic<V: DepthwiseVariant>(
    variant: &V,
    acc: &mut [V::Acc],
    row: &[V::Input],
    taps: &[V::Kernel],
    span: TapSpan,
    stride_x: usize,
) {
    debug_assert!(span.extent() <= taps.len());
    let d = span.dilation;
    for (x, a) in acc.iter_mut().enumerate() {
        let base = x * stride_x;
        let mut sum = *a;
        for kx in 0..span.count {
            sum = variant.mac(sum, row[base + kx * d], taps[kx * d]);
        }
        *a = sum;
    }
}

/// Row loop for a padded width of exactly `W` taps.
///
/// The real taps are gathered to the front of a `W`-wide array along with
/// their offsets, so the inner loops index fixed-size arrays only.
pub fn accumulate_row_fixed<V: DepthwiseVariant, const W: usize>(
    variant: &V,
    acc: &mut [V::Acc],
    row: &[V::Input],
    taps: &[V::Kernel],
    span: TapSpan,
    stride_x: usize,
) {
    debug_assert_eq!(taps.len(), W);
    debug_assert!(span.extent() <= W);
    let count = span.count.min(W);
    let offsets: [usize; W] = std::array::from_fn(|i| (i * span.dilation).min(W - 1));
    let taps: [V::Kernel; W] = std::array::from_fn(|i| taps[offsets[i]]);
    let (offsets, taps) = (&offsets[..count], &taps[..count]);

    let mut x = 0;
    let mut quads = acc.chunks_exact_mut(4);
    for quad in &mut quads {
        let mut sums = [quad[0], quad[1], quad[2], quad[3]];
        let bases = [
            x * stride_x,
            (x + 1) * stride_x,
            (x + 2) * stride_x,
            (x + 3) * stride_x,
        ];
        for (&off, &k) in offsets.iter().zip(taps) {
            for (sum, &base) in sums.iter_mut().zip(&bases) {
                *sum = variant.mac(*sum, row[base + off], k);
            }
        }
        quad.copy_from_slice(&sums);
        x += 4;
    }

    for a in quads.into_remainder() {
        let base = x * stride_x;
        let mut sum = *a;
        for (&off, &k) in offsets.iter().zip(taps) {
            sum = variant.mac(sum, row[base + off], k);
        }
        *a = sum;
        x += 1;
    }
}
