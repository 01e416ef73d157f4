//! CPU runtime: scratch planning, the circular buffer and compute kernels.

pub mod circ_buf;
pub mod kernels;
pub mod scratch;

pub use circ_buf::{CircularBuffer, FeedStats, RingPhase, RingState, Window};
pub use scratch::{
    plan, ConvPlan, Region, ScratchBuffer, ScratchLayout, ScratchParts, CHANNEL_ALIGN,
    KERNEL_WIDTH_ALIGN, OUTPUTS_PER_TILE, SCRATCH_ALIGN,
};
