//! Scratch layout planner.
//!
//! [`plan`] is a pure function of the validated geometry, the input layout
//! and the precision. It fixes the size of every scratch region once; the
//! compute path only ever sees the typed slices [`ConvPlan::bind`] carves
//! out of the caller's buffer.
//!
//! ```text
//! +--------+----------------------+-----------------+-----------------+
//! | header | circular buffer      | staged kernel   | accumulators    |
//! | 32 B   | capacity x stride    | padded filters  | one tile row    |
//! +--------+----------------------+-----------------+-----------------+
//!   each region starts on an 8-byte boundary
//! ```

use super::circ_buf::RingState;
use crate::algorithm::{decompose_axis, gcd, max_outputs};
use crate::dtype::Precision;
use crate::error::{Error, Result};
use crate::ops::conv_common::DepthwiseGeometry;
use crate::tensor::DataLayout;
use bytemuck::Pod;
use std::mem::size_of;

/// Alignment of the scratch buffer and of every region inside it.
pub const SCRATCH_ALIGN: usize = 8;

/// Padded kernel rows are a multiple of this many taps.
pub const KERNEL_WIDTH_ALIGN: usize = 4;

/// Channel-last columns hold a multiple of this many output channels.
pub const CHANNEL_ALIGN: usize = 4;

/// Outputs produced per circular-buffer feed.
pub const OUTPUTS_PER_TILE: usize = 4;

#[inline]
fn align_up(value: usize, align: usize) -> Option<usize> {
    Some(value.checked_add(align - 1)? / align * align)
}

fn overflow(what: &'static str) -> Error {
    Error::CapacityOverflow { what }
}

/// A byte range inside the scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    /// Byte offset from the start of scratch.
    pub offset: usize,
    /// Bytes used by the region (before alignment padding).
    pub len: usize,
}

impl Region {
    /// One past the last byte.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }
}

/// Byte offsets of every scratch region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScratchLayout {
    /// Circular-buffer counters.
    pub header: Region,
    /// Circular-buffer slots.
    pub ring: Region,
    /// Padded kernel staging.
    pub kernel: Region,
    /// Wide accumulators.
    pub acc: Region,
    /// Total bytes, a multiple of [`SCRATCH_ALIGN`].
    pub total: usize,
}

impl ScratchLayout {
    fn new(ring_bytes: usize, kernel_bytes: usize, acc_bytes: usize) -> Result<Self> {
        let mut offset = 0usize;
        let mut next = |len: usize| -> Result<Region> {
            let region = Region { offset, len };
            offset = offset
                .checked_add(len)
                .and_then(|end| align_up(end, SCRATCH_ALIGN))
                .ok_or(overflow("scratch size"))?;
            Ok(region)
        };
        let header = next(size_of::<RingState>())?;
        let ring = next(ring_bytes)?;
        let kernel = next(kernel_bytes)?;
        let acc = next(acc_bytes)?;
        let total = offset;
        if total > i32::MAX as usize {
            return Err(overflow("scratch size"));
        }
        Ok(Self {
            header,
            ring,
            kernel,
            acc,
            total,
        })
    }
}

/// Everything the compute path needs to know about the scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvPlan {
    /// Validated geometry.
    pub geometry: DepthwiseGeometry,
    /// Input layout; selects rows (channel-first) or columns (channel-last).
    pub layout: DataLayout,
    /// Arithmetic scheme.
    pub precision: Precision,
    /// Outputs per feed along the streaming axis.
    pub tile: usize,
    /// Circular-buffer slots.
    pub ring_capacity: usize,
    /// Elements per slot.
    pub ring_stride: usize,
    /// Elements per staged kernel row: padded kernel width (channel-first)
    /// or padded channel count (channel-last).
    pub kernel_row: usize,
    /// Elements in the kernel staging region.
    pub kernel_len: usize,
    /// Accumulators in the accumulator region.
    pub acc_len: usize,
    /// Byte layout.
    pub scratch: ScratchLayout,
}

/// Plan the scratch buffer of one convolution.
pub fn plan(
    geometry: &DepthwiseGeometry,
    layout: DataLayout,
    precision: Precision,
) -> Result<ConvPlan> {
    let g = geometry;
    let (tile, ring_capacity, ring_stride, kernel_row, kernel_len, acc_len) = match layout {
        DataLayout::ChannelFirst => {
            let subs = decompose_axis(
                g.input.height,
                g.output.height,
                g.stride_y,
                g.dilation_y,
                g.pad_top,
            );
            let reduced = g.stride_y / gcd(g.dilation_y, g.stride_y);
            let tile = OUTPUTS_PER_TILE.min(max_outputs(&subs)).max(1);
            let capacity = (tile - 1)
                .checked_mul(reduced)
                .and_then(|v| v.checked_add(g.kernel.height))
                .ok_or(overflow("ring capacity"))?;

            let kw_pad = align_up(g.dilated_kernel_width(), KERNEL_WIDTH_ALIGN)
                .ok_or(overflow("kernel width"))?;
            let row = (g.output.width - 1)
                .checked_mul(g.stride_x)
                .and_then(|v| v.checked_add(kw_pad))
                .and_then(|v| align_up(v, KERNEL_WIDTH_ALIGN))
                .ok_or(overflow("ring row"))?;
            let kernel_len = g
                .multiplier
                .checked_mul(g.kernel.height)
                .and_then(|v| v.checked_mul(kw_pad))
                .ok_or(overflow("kernel staging"))?;
            (tile, capacity, row, kw_pad, kernel_len, g.output.width)
        }
        DataLayout::ChannelLast => {
            let subs = decompose_axis(
                g.input.width,
                g.output.width,
                g.stride_x,
                g.dilation_x,
                g.pad_left,
            );
            let reduced = g.stride_x / gcd(g.dilation_x, g.stride_x);
            let tile = OUTPUTS_PER_TILE.min(max_outputs(&subs)).max(1);
            let capacity = (tile - 1)
                .checked_mul(reduced)
                .and_then(|v| v.checked_add(g.kernel.width))
                .ok_or(overflow("ring capacity"))?;

            let cm_pad = align_up(g.out_channels(), CHANNEL_ALIGN).ok_or(overflow("channels"))?;
            let kh_dil = g.dilated_kernel_height();
            let column = (g.output.height - 1)
                .checked_mul(g.stride_y)
                .and_then(|v| v.checked_add(kh_dil))
                .and_then(|v| v.checked_mul(cm_pad))
                .ok_or(overflow("ring column"))?;
            let kernel_len = kh_dil
                .checked_mul(g.kernel.width)
                .and_then(|v| v.checked_mul(cm_pad))
                .ok_or(overflow("kernel staging"))?;
            (tile, capacity, column, cm_pad, kernel_len, cm_pad)
        }
    };

    let ring_bytes = ring_capacity
        .checked_mul(ring_stride)
        .and_then(|v| v.checked_mul(precision.input_size()))
        .ok_or(overflow("ring size"))?;
    let kernel_bytes = kernel_len
        .checked_mul(precision.kernel_size())
        .ok_or(overflow("kernel staging"))?;
    let acc_bytes = acc_len
        .checked_mul(precision.accumulator_size())
        .ok_or(overflow("accumulator staging"))?;

    let scratch = ScratchLayout::new(ring_bytes, kernel_bytes, acc_bytes)?;

    Ok(ConvPlan {
        geometry: *geometry,
        layout,
        precision,
        tile,
        ring_capacity,
        ring_stride,
        kernel_row,
        kernel_len,
        acc_len,
        scratch,
    })
}

/// Typed views of the scratch regions.
#[derive(Debug)]
pub struct ScratchParts<'a, I, K, A> {
    /// Circular-buffer counters.
    pub state: &'a mut RingState,
    /// Circular-buffer slots.
    pub ring: &'a mut [I],
    /// Staged kernel.
    pub kernel: &'a mut [K],
    /// Accumulators.
    pub acc: &'a mut [A],
}

fn typed<'a, T: Pod>(
    bytes: &'a mut [u8],
    count: usize,
    what: &'static str,
) -> Result<&'a mut [T]> {
    let n = count * size_of::<T>();
    bytemuck::try_cast_slice_mut(&mut bytes[..n]).map_err(|e| {
        Error::Internal(format!(
            "cannot view {} as {}: {:?}",
            what,
            std::any::type_name::<T>(),
            e
        ))
    })
}

impl ConvPlan {
    /// Scratch bytes this plan needs.
    #[inline]
    pub fn scratch_bytes(&self) -> usize {
        self.scratch.total
    }

    /// Split caller scratch into typed regions.
    ///
    /// Fails with [`Error::Misaligned`] if `scratch` does not start on an
    /// 8-byte boundary and with [`Error::ScratchTooSmall`] if it is shorter
    /// than [`ConvPlan::scratch_bytes`].
    pub fn bind<'a, I: Pod, K: Pod, A: Pod>(
        &self,
        scratch: &'a mut [u8],
    ) -> Result<ScratchParts<'a, I, K, A>> {
        if scratch.as_ptr() as usize % SCRATCH_ALIGN != 0 {
            return Err(Error::Misaligned {
                what: "scratch",
                align: SCRATCH_ALIGN,
            });
        }
        if scratch.len() < self.scratch.total {
            return Err(Error::ScratchTooSmall {
                required: self.scratch.total,
                got: scratch.len(),
            });
        }
        let p = self.precision;
        if size_of::<I>() != p.input_size()
            || size_of::<K>() != p.kernel_size()
            || size_of::<A>() != p.accumulator_size()
        {
            return Err(Error::Internal(format!(
                "element types do not match the {} plan",
                p
            )));
        }

        let s = &self.scratch;
        let (header, rest) = scratch.split_at_mut(s.ring.offset);
        let (ring, rest) = rest.split_at_mut(s.kernel.offset - s.ring.offset);
        let (kernel, acc) = rest.split_at_mut(s.acc.offset - s.kernel.offset);

        let state = bytemuck::try_from_bytes_mut::<RingState>(&mut header[..size_of::<RingState>()])
            .map_err(|e| Error::Internal(format!("cannot view ring header: {:?}", e)))?;
        Ok(ScratchParts {
            state,
            ring: typed(ring, self.ring_capacity * self.ring_stride, "ring")?,
            kernel: typed(kernel, self.kernel_len, "kernel staging")?,
            acc: typed(acc, self.acc_len, "accumulators")?,
        })
    }
}

/// Owned scratch memory aligned for [`ConvPlan::bind`].
#[derive(Debug, Clone, Default)]
pub struct ScratchBuffer {
    words: Vec<u64>,
    len: usize,
}

impl ScratchBuffer {
    /// Allocate `bytes` zeroed bytes on an 8-byte boundary.
    pub fn new(bytes: usize) -> Self {
        Self {
            words: vec![0; bytes.div_ceil(size_of::<u64>())],
            len: bytes,
        }
    }

    /// Size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the buffer holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The buffer as bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.words);
        &mut bytes[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::conv_common::validate_depthwise;
    use crate::ops::{ConvParams, PaddingMode};
    use crate::tensor::{KernelShape, TensorShape};

    fn geometry(h: usize, w: usize, c: usize, params: ConvParams) -> DepthwiseGeometry {
        validate_depthwise(TensorShape::new(h, w, c), &params).unwrap()
    }

    #[test]
    fn test_channel_first_plan() {
        let params = ConvParams::new(KernelShape::new(3, 3), 2).with_padding(PaddingMode::Same);
        let g = geometry(8, 8, 3, params);
        let p = plan(&g, DataLayout::ChannelFirst, Precision::F32).unwrap();
        assert_eq!(p.tile, 4);
        assert_eq!(p.ring_capacity, 3 + 3);
        assert_eq!(p.kernel_row, 4);
        // (8 - 1) * 1 + 4 = 11 -> 12
        assert_eq!(p.ring_stride, 12);
        assert_eq!(p.kernel_len, 2 * 3 * 4);
        assert_eq!(p.acc_len, 8);
        let s = p.scratch;
        assert_eq!(s.header.offset, 0);
        assert_eq!(s.ring.offset, 32);
        assert_eq!(s.ring.len, 6 * 12 * 4);
        assert_eq!(s.kernel.offset, s.ring.end());
        assert_eq!(s.acc.offset, s.kernel.end());
        assert_eq!(s.total, s.acc.end());
    }

    #[test]
    fn test_channel_last_plan() {
        let params = ConvParams::new(KernelShape::new(3, 2), 1).with_dilation(1, 2);
        let g = geometry(9, 6, 3, params);
        let p = plan(&g, DataLayout::ChannelLast, Precision::Asym8).unwrap();
        // out = 5 x 5, kh_dil = 5, col height 4 + 5 = 9, cm_pad 4
        assert_eq!(p.ring_stride, 9 * 4);
        assert_eq!(p.ring_capacity, 2 + 3);
        assert_eq!(p.kernel_len, 5 * 2 * 4);
        assert_eq!(p.acc_len, 4);
        assert_eq!(p.scratch.acc.len, 4 * 8);
    }

    #[test]
    fn test_regions_are_aligned() {
        for precision in Precision::ALL {
            for layout in [DataLayout::ChannelFirst, DataLayout::ChannelLast] {
                let params = ConvParams::new(KernelShape::new(3, 5), 3)
                    .with_stride(2, 3)
                    .with_dilation(3, 2)
                    .with_padding(PaddingMode::symmetric(2, 1));
                let g = geometry(11, 13, 5, params);
                let p = plan(&g, layout, precision).unwrap();
                let s = p.scratch;
                for r in [s.header, s.ring, s.kernel, s.acc] {
                    assert_eq!(r.offset % SCRATCH_ALIGN, 0);
                }
                assert_eq!(s.total % SCRATCH_ALIGN, 0);
                assert!(s.acc.end() <= s.total);
            }
        }
    }

    #[test]
    fn test_dilation_keeps_ring_small() {
        // Dilation 5 with stride 1 splits the rows into five classes, each
        // streamed through a ring of kernel + 3 rows.
        let params = ConvParams::new(KernelShape::new(3, 3), 1).with_dilation(1, 5);
        let g = geometry(40, 8, 1, params);
        let p = plan(&g, DataLayout::ChannelFirst, Precision::Fixed16).unwrap();
        assert_eq!(p.ring_capacity, 3 + 3);
    }

    #[test]
    fn test_plan_overflow() {
        // A 2-wide output row strided 2^30 apart needs a 4 GiB ring.
        let params = ConvParams::new(KernelShape::new(1, 1), 1).with_stride(1 << 30, 1);
        let g = geometry(1, (1 << 30) + 1, 1, params);
        assert_eq!(g.output, TensorShape::new(1, 2, 1));
        let err = plan(&g, DataLayout::ChannelFirst, Precision::F32).unwrap_err();
        assert!(matches!(err, Error::CapacityOverflow { .. }));
    }

    #[test]
    fn test_typed_view_writes_through() {
        let mut buf = ScratchBuffer::new(16);
        let bytes = buf.as_bytes_mut();
        {
            let words = typed::<u32>(bytes, 3, "words").unwrap();
            assert_eq!(words.len(), 3);
            words[1] = u32::from_ne_bytes([1, 2, 3, 4]);
        }
        assert_eq!(&bytes[4..8], &[1, 2, 3, 4]);
        assert_eq!(&bytes[12..], &[0, 0, 0, 0]);

        let err = typed::<u64>(&mut bytes[1..9], 1, "words").unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn test_bind_checks() {
        let params = ConvParams::new(KernelShape::new(3, 3), 1);
        let g = geometry(6, 6, 2, params);
        let p = plan(&g, DataLayout::ChannelFirst, Precision::F32).unwrap();

        let mut buf = ScratchBuffer::new(p.scratch_bytes() + 8);
        let bytes = buf.as_bytes_mut();
        let parts = p.bind::<f32, f32, f32>(bytes).unwrap();
        assert_eq!(parts.ring.len(), p.ring_capacity * p.ring_stride);
        assert_eq!(parts.kernel.len(), p.kernel_len);
        assert_eq!(parts.acc.len(), p.acc_len);

        let err = p.bind::<f32, f32, f32>(&mut bytes[1..]).unwrap_err();
        assert_eq!(err, Error::Misaligned { what: "scratch", align: 8 });

        let err = p.bind::<f32, f32, f32>(&mut bytes[..8]).unwrap_err();
        assert!(matches!(err, Error::ScratchTooSmall { .. }));

        let err = p.bind::<i8, i8, i64>(bytes).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
