//! Shape types for 3-D activations (batch is implied by repeated calls) and
//! 2-D filters

use std::fmt;

/// Dimensions of one activation tensor.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct TensorShape {
    /// Rows
    pub height: usize,
    /// Columns
    pub width: usize,
    /// Channels
    pub channels: usize,
}

impl TensorShape {
    /// Create a shape.
    pub const fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Total number of elements, or `None` on overflow.
    #[inline]
    pub fn checked_numel(&self) -> Option<usize> {
        self.height
            .checked_mul(self.width)?
            .checked_mul(self.channels)
    }

    /// Total number of elements.
    #[inline]
    pub fn numel(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl fmt::Debug for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[h={}, w={}, c={}]", self.height, self.width, self.channels)
    }
}

/// Spatial extent of one depthwise filter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct KernelShape {
    /// Filter rows
    pub height: usize,
    /// Filter columns
    pub width: usize,
}

impl KernelShape {
    /// Create a kernel shape.
    pub const fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Number of taps in one filter.
    #[inline]
    pub fn taps(&self) -> usize {
        self.height * self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numel() {
        let s = TensorShape::new(4, 5, 3);
        assert_eq!(s.numel(), 60);
        assert_eq!(s.checked_numel(), Some(60));
        assert_eq!(TensorShape::new(4, 0, 3).numel(), 0);
    }

    #[test]
    fn test_checked_numel_overflow() {
        let s = TensorShape::new(usize::MAX, 2, 1);
        assert_eq!(s.checked_numel(), None);
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", TensorShape::new(1, 2, 3)), "[h=1, w=2, c=3]");
    }
}
