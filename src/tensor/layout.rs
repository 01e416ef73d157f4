//! Layout tag: channel-last (NHWC) or channel-first (NCHW) memory order

use super::TensorShape;
use crate::error::{Error, Result};
use std::fmt;

/// Memory order of a 3-D activation tensor
///
/// Address of element `(y, x, c)`:
/// - `ChannelLast`:  `(y * width + x) * channels + c`
/// - `ChannelFirst`: `(c * height + y) * width + x`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum DataLayout {
    /// `[H][W][C]`
    #[default]
    ChannelLast = 0,
    /// `[C][H][W]`
    ChannelFirst = 1,
}

impl DataLayout {
    /// Parse the raw tag used by foreign callers (0 = channel-last,
    /// 1 = channel-first).
    pub fn from_tag(tag: i32) -> Result<Self> {
        match tag {
            0 => Ok(DataLayout::ChannelLast),
            1 => Ok(DataLayout::ChannelFirst),
            _ => Err(Error::UnsupportedLayout { tag }),
        }
    }

    /// Raw tag of this layout.
    #[inline]
    pub const fn tag(self) -> i32 {
        self as i32
    }

    /// Flat offset of logical element `(y, x, c)`.
    #[inline]
    pub fn offset(self, shape: &TensorShape, y: usize, x: usize, c: usize) -> usize {
        match self {
            DataLayout::ChannelLast => (y * shape.width + x) * shape.channels + c,
            DataLayout::ChannelFirst => (c * shape.height + y) * shape.width + x,
        }
    }

    /// Name of the layout for error messages.
    pub const fn name(self) -> &'static str {
        match self {
            DataLayout::ChannelLast => "NHWC",
            DataLayout::ChannelFirst => "NCHW",
        }
    }
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
