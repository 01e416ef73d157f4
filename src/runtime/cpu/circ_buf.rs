//! Circular buffer of padded input rows or columns.
//!
//! The buffer streams the subsampled sequence `u[j]` of one
//! [`SubAxis`] through a fixed number of slots. Each slot holds one entry:
//! a padded input row on the channel-first path, a padded input column on
//! the channel-last path. Entries are appended in increasing `j`; the
//! newest `resident` entries are addressable through a [`Window`].
//!
//! Counters live in a [`RingState`] inside the scratch header, so the
//! whole streaming state of a call is part of caller-provided memory.

use crate::algorithm::SubAxis;
use crate::dtype::Element;
use crate::error::{Error, Result};
use bytemuck::{Pod, Zeroable};

/// Lifecycle of a circular buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RingPhase {
    /// Slots hold arbitrary bytes.
    Uninitialized = 0,
    /// Every slot holds the pad value; nothing is resident.
    Primed = 1,
    /// At least one feed has happened since the last prime or restart.
    Streaming = 2,
}

impl RingPhase {
    fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(RingPhase::Uninitialized),
            1 => Ok(RingPhase::Primed),
            2 => Ok(RingPhase::Streaming),
            other => Err(Error::Internal(format!("corrupt ring phase {}", other))),
        }
    }
}

/// Counters of a circular buffer, stored in the scratch header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RingState {
    /// Slots in the ring.
    pub capacity: u32,
    /// Elements per slot.
    pub stride: u32,
    /// Slot the next entry is written to.
    pub cursor: u32,
    /// Valid entries ending just before `cursor`.
    pub resident: u32,
    /// Subsampled index of the next entry to append.
    pub next: u32,
    /// Raw [`RingPhase`].
    pub phase: u32,
    /// Keeps the header a multiple of 8 bytes.
    pub reserved: [u32; 2],
}

/// What one `feed` wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    /// Entries appended.
    pub added: usize,
    /// Entries appended from before the start of the input.
    pub pad_lead: usize,
    /// Entries appended from real input.
    pub real: usize,
    /// Entries appended from past the end of the input.
    pub pad_trail: usize,
    /// Entries jumped over because no window needs them.
    pub skipped: usize,
}

impl std::ops::AddAssign for FeedStats {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.pad_lead += rhs.pad_lead;
        self.real += rhs.real;
        self.pad_trail += rhs.pad_trail;
        self.skipped += rhs.skipped;
    }
}

/// Fixed-capacity ring over a scratch region.
#[derive(Debug)]
pub struct CircularBuffer<'a, T> {
    state: &'a mut RingState,
    data: &'a mut [T],
    pad: T,
}

impl<'a, T: Element> CircularBuffer<'a, T> {
    /// Attach to a header and a slot region. The ring starts uninitialized.
    pub fn new(state: &'a mut RingState, data: &'a mut [T]) -> Self {
        *state = RingState::default();
        Self {
            state,
            data,
            pad: T::zero(),
        }
    }

    /// Size the ring and fill every slot with `pad`.
    pub fn init(&mut self, capacity: usize, stride: usize, pad: T) -> Result<()> {
        let needed = capacity
            .checked_mul(stride)
            .filter(|&n| capacity > 0 && stride > 0 && n <= self.data.len())
            .ok_or_else(|| {
                Error::Internal(format!(
                    "ring of {}x{} does not fit {} slots",
                    capacity,
                    stride,
                    self.data.len()
                ))
            })?;
        let capacity_u32 = u32::try_from(capacity)
            .map_err(|_| Error::CapacityOverflow { what: "ring capacity" })?;
        let stride_u32 =
            u32::try_from(stride).map_err(|_| Error::CapacityOverflow { what: "ring stride" })?;

        self.data[..needed].fill(pad);
        self.pad = pad;
        *self.state = RingState {
            capacity: capacity_u32,
            stride: stride_u32,
            phase: RingPhase::Primed as u32,
            ..RingState::default()
        };
        Ok(())
    }

    /// Forget all resident entries before streaming a new sequence.
    ///
    /// Slot contents are left as they are; every slot is rewritten before
    /// it is read again.
    pub fn restart(&mut self) -> Result<()> {
        if self.phase()? == RingPhase::Uninitialized {
            return Err(Error::Internal("restart before init".into()));
        }
        self.state.cursor = 0;
        self.state.resident = 0;
        self.state.next = 0;
        self.state.phase = RingPhase::Primed as u32;
        Ok(())
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Result<RingPhase> {
        RingPhase::from_raw(self.state.phase)
    }

    /// Slots in the ring.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.state.capacity as usize
    }

    /// Elements per slot.
    #[inline]
    pub fn stride(&self) -> usize {
        self.state.stride as usize
    }

    /// Valid entries currently held.
    #[inline]
    pub fn resident(&self) -> usize {
        self.state.resident as usize
    }

    /// Subsampled index of the next entry to append.
    #[inline]
    pub fn next(&self) -> usize {
        self.state.next as usize
    }

    /// Make entries `start..start + len` of `axis` resident.
    ///
    /// Entries already resident are kept; entries between the last
    /// appended one and `start` are skipped. Each new entry is either
    /// produced by `load(input_coordinate, slot)` or filled with the pad
    /// value.
    pub fn feed<F>(
        &mut self,
        axis: &SubAxis,
        start: usize,
        len: usize,
        mut load: F,
    ) -> Result<FeedStats>
    where
        F: FnMut(usize, &mut [T]),
    {
        if self.phase()? == RingPhase::Uninitialized {
            return Err(Error::Internal("feed before init".into()));
        }
        let capacity = self.capacity();
        let stride = self.stride();
        if len == 0 || len > capacity {
            return Err(Error::Internal(format!(
                "window of {} entries does not fit a ring of {}",
                len, capacity
            )));
        }
        let end = start + len;
        let end_u32 =
            u32::try_from(end).map_err(|_| Error::CapacityOverflow { what: "ring index" })?;

        let mut stats = FeedStats::default();
        let mut next = self.next();
        if next < start {
            stats.skipped = start - next;
            self.state.resident = 0;
            next = start;
        } else if start < next - self.resident() {
            return Err(Error::Internal(format!(
                "entry {} is no longer resident (next {}, resident {})",
                start,
                next,
                self.resident()
            )));
        }
        if end <= next {
            self.state.phase = RingPhase::Streaming as u32;
            return Ok(stats);
        }

        let to_add = end - next;
        let (pad_lead, real, pad_trail) = axis.split(next, to_add);
        stats.added = to_add;
        stats.pad_lead = pad_lead;
        stats.real = real;
        stats.pad_trail = pad_trail;

        let mut cursor = self.state.cursor as usize;
        for j in next..end {
            let slot = &mut self.data[cursor * stride..(cursor + 1) * stride];
            match axis.sample(j) {
                Some(coord) => load(coord, slot),
                None => slot.fill(self.pad),
            }
            cursor += 1;
            if cursor == capacity {
                cursor = 0;
            }
        }

        self.state.cursor = cursor as u32;
        self.state.resident = (self.resident() + to_add).min(capacity) as u32;
        self.state.next = end_u32;
        self.state.phase = RingPhase::Streaming as u32;
        Ok(stats)
    }

    /// Entries `start..start + len`, which must all be resident.
    pub fn window(&self, start: usize, len: usize) -> Result<Window<'_, T>> {
        let next = self.next();
        let oldest = next - self.resident();
        if start < oldest || start + len > next || len == 0 {
            return Err(Error::Internal(format!(
                "window {}..{} not resident (have {}..{})",
                start,
                start + len,
                oldest,
                next
            )));
        }
        let capacity = self.capacity();
        let begin = (self.state.cursor as usize + capacity - (next - start)) % capacity;
        Ok(Window {
            data: &self.data[..capacity * self.stride()],
            stride: self.stride(),
            capacity,
            begin,
            len,
        })
    }
}

/// Read-only view of consecutive resident entries.
///
/// The entries may straddle the end of the slot region; [`Window::row`]
/// wraps every access.
#[derive(Debug, Clone, Copy)]
pub struct Window<'b, T> {
    data: &'b [T],
    stride: usize,
    capacity: usize,
    begin: usize,
    len: usize,
}

impl<'b, T> Window<'b, T> {
    /// Entry `i` of the window.
    #[inline]
    pub fn row(&self, i: usize) -> &'b [T] {
        debug_assert!(i < self.len);
        let mut slot = self.begin + i;
        if slot >= self.capacity {
            slot -= self.capacity;
        }
        &self.data[slot * self.stride..(slot + 1) * self.stride]
    }

    /// Entries in the window.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the window holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Slot length.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns true if the window straddles the end of the slot region.
    #[inline]
    pub fn wraps(&self) -> bool {
        self.begin + self.len > self.capacity
    }

    /// All entries as one slice, `stride` per entry, unless the window
    /// wraps.
    #[inline]
    pub fn contiguous(&self) -> Option<&'b [T]> {
        if self.wraps() {
            None
        } else {
            Some(&self.data[self.begin * self.stride..(self.begin + self.len) * self.stride])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::decompose_axis;

    const PAD: i32 = -7;

    fn naive_padded(input: &[i32], pad_before: usize, pad_after: usize) -> Vec<i32> {
        let mut v = vec![PAD; pad_before];
        v.extend_from_slice(input);
        v.extend(std::iter::repeat(PAD).take(pad_after));
        v
    }

    #[test]
    fn test_init_fills_pad() {
        let mut state = RingState::default();
        let mut data = vec![0i16; 12];
        let mut ring = CircularBuffer::new(&mut state, &mut data);
        assert_eq!(ring.phase().unwrap(), RingPhase::Uninitialized);
        assert!(ring.restart().is_err());
        ring.init(3, 4, 5).unwrap();
        assert_eq!(ring.phase().unwrap(), RingPhase::Primed);
        drop(ring);
        assert!(data.iter().all(|&v| v == 5));
    }

    #[test]
    fn test_init_rejects_oversize() {
        let mut state = RingState::default();
        let mut data = vec![0i8; 8];
        let mut ring = CircularBuffer::new(&mut state, &mut data);
        assert!(ring.init(3, 3, 0).is_err());
        assert!(ring.init(0, 3, 0).is_err());
    }

    #[test]
    fn test_window_wraps() {
        let input: Vec<i32> = (0..10).collect();
        let subs = decompose_axis(10, 8, 1, 1, 0);
        let sub = subs[0];
        let mut state = RingState::default();
        let mut data = vec![0i32; 3];
        let mut ring = CircularBuffer::new(&mut state, &mut data);
        ring.init(3, 1, PAD).unwrap();

        let mut saw_wrap = false;
        for o in 0..8 {
            ring.feed(&sub, o, 3, |i, slot| slot[0] = input[i]).unwrap();
            let w = ring.window(o, 3).unwrap();
            saw_wrap |= w.wraps();
            for k in 0..3 {
                assert_eq!(w.row(k)[0], input[o + k]);
            }
            match w.contiguous() {
                Some(flat) => assert_eq!(flat, &input[o..o + 3]),
                None => assert!(w.wraps()),
            }
        }
        assert!(saw_wrap);
    }

    #[test]
    fn test_window_requires_residency() {
        let subs = decompose_axis(10, 8, 1, 1, 0);
        let mut state = RingState::default();
        let mut data = vec![0i32; 4];
        let mut ring = CircularBuffer::new(&mut state, &mut data);
        ring.init(4, 1, PAD).unwrap();
        ring.feed(&subs[0], 0, 3, |i, slot| slot[0] = i as i32).unwrap();
        assert!(ring.window(0, 3).is_ok());
        assert!(ring.window(1, 3).is_err());
        assert!(ring.feed(&subs[0], 0, 5, |_, _| {}).is_err());
    }

    #[test]
    fn test_skip_gaps_with_large_stride() {
        // kernel 2, stride 5: entries 2..5 are never read.
        let subs = decompose_axis(12, 2, 5, 1, 0);
        let mut state = RingState::default();
        let mut data = vec![0i32; 2];
        let mut ring = CircularBuffer::new(&mut state, &mut data);
        ring.init(2, 1, PAD).unwrap();
        let s = ring.feed(&subs[0], 0, 2, |i, slot| slot[0] = i as i32).unwrap();
        assert_eq!((s.added, s.skipped), (2, 0));
        let s = ring.feed(&subs[0], 5, 2, |i, slot| slot[0] = i as i32).unwrap();
        assert_eq!((s.added, s.skipped), (2, 3));
        let w = ring.window(5, 2).unwrap();
        assert_eq!((w.row(0)[0], w.row(1)[0]), (5, 6));
    }

    /// For every output position the streamed window equals the slice of a
    /// fully materialized padded array, and the real/pad counts match.
    #[test]
    fn test_padding_matches_materialized_array() {
        for input_len in [1usize, 4, 9] {
            for kernel in [1usize, 2, 3, 5] {
                for dilation in [1usize, 2, 3] {
                    for stride in [1usize, 2, 3] {
                        for (before, after) in [(0, 0), (1, 1), (2, 0), (0, 3), (4, 4)] {
                            check_padding(input_len, kernel, dilation, stride, before, after);
                        }
                    }
                }
            }
        }
    }

    fn check_padding(
        input_len: usize,
        kernel: usize,
        dilation: usize,
        stride: usize,
        pad_before: usize,
        pad_after: usize,
    ) {
        let extent = (kernel - 1) * dilation + 1;
        let padded_len = input_len + pad_before + pad_after;
        if padded_len < extent {
            return;
        }
        let out_len = (padded_len - extent) / stride + 1;
        let input: Vec<i32> = (100..100 + input_len as i32).collect();
        let naive = naive_padded(&input, pad_before, pad_after);

        let tile = 2usize;
        let subs = decompose_axis(input_len, out_len, stride, dilation, pad_before);
        let reduced = subs[0].stride;
        let capacity = kernel + (tile - 1) * reduced;

        let mut state = RingState::default();
        let mut data = vec![0i32; capacity];
        let mut ring = CircularBuffer::new(&mut state, &mut data);
        ring.init(capacity, 1, PAD).unwrap();

        for sub in &subs {
            ring.restart().unwrap();
            let mut totals = FeedStats::default();
            let mut needed = vec![false; sub.span(kernel)];
            let mut q = 0;
            while q < sub.outputs {
                let n = tile.min(sub.outputs - q);
                let start = q * sub.stride;
                let len = (n - 1) * sub.stride + kernel;
                totals += ring.feed(sub, start, len, |i, slot| slot[0] = input[i]).unwrap();
                let w = ring.window(start, len).unwrap();
                needed[start..start + len].fill(true);
                for t in 0..n {
                    let o = sub.output_index(q + t);
                    for k in 0..kernel {
                        assert_eq!(
                            w.row(t * sub.stride + k)[0],
                            naive[o * stride + k * dilation],
                            "len={input_len} k={kernel} d={dilation} s={stride} pad=({pad_before},{pad_after}) o={o} k={k}"
                        );
                    }
                }
                q += n;
            }

            // Count real vs pad samples over the same entries of the naive array.
            let mut real = 0;
            let mut pad = 0;
            for (j, _) in needed.iter().enumerate().filter(|(_, &n)| n) {
                let idx = sub.origin + (j * dilation) as isize + pad_before as isize;
                if naive[idx as usize] == PAD {
                    pad += 1;
                } else {
                    real += 1;
                }
            }
            assert_eq!(totals.real, real);
            assert_eq!(totals.pad_lead + totals.pad_trail, pad);
            assert_eq!(totals.added, real + pad);
        }
    }
}
